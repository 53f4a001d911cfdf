//! Yoga alignment rules over normalized `[0, 1]` coordinates.
//!
//! Joint angles use [`angle`]. Each failed check contributes one
//! correction, in the order the checks are listed.

use super::part;
use crate::geometry::{angle, distance, foot_angle, midpoint};
use crate::landmark::{BodyPart::*, Skeleton};

fn check(corrections: &mut Vec<String>, ok: bool, message: &str) {
    if !ok {
        corrections.push(message.to_string());
    }
}

pub(super) fn mountain(s: &Skeleton) -> Vec<String> {
    let (ls, rs) = (part(s, LeftShoulder), part(s, RightShoulder));
    let (lh, rh) = (part(s, LeftHip), part(s, RightHip));
    let (lw, rw) = (part(s, LeftWrist), part(s, RightWrist));
    let nose = part(s, Nose);
    let ears = midpoint(&part(s, LeftEar), &part(s, RightEar));

    let mut out = Vec::new();
    check(&mut out, (ls.y - rs.y).abs() < 0.08, "Level your shoulders.");
    check(
        &mut out,
        (nose.x - ears.0).abs() < 0.06,
        "Keep your head centered over your shoulders.",
    );
    check(&mut out, (lh.y - rh.y).abs() < 0.08, "Level your hips.");
    check(
        &mut out,
        distance(&lw, &lh) < 0.3 && distance(&rw, &rh) < 0.3,
        "Relax your arms by your sides.",
    );
    check(&mut out, nose.y < lh.y, "Stand tall with your head above your hips.");
    out
}

/// Left leg standing, right foot raised.
pub(super) fn tree(s: &Skeleton) -> Vec<String> {
    let (lh, rh) = (part(s, LeftHip), part(s, RightHip));
    let (lk, rk) = (part(s, LeftKnee), part(s, RightKnee));
    let (la, ra) = (part(s, LeftAnkle), part(s, RightAnkle));
    let (lw, rw) = (part(s, LeftWrist), part(s, RightWrist));

    let mut out = Vec::new();
    check(
        &mut out,
        (angle(&lh, &lk, &la) - 180.0).abs() < 15.0,
        "Straighten your standing leg.",
    );
    check(
        &mut out,
        distance(&ra, &lk) < 0.25 || distance(&ra, &la) < 0.2,
        "Place your raised foot against your standing leg.",
    );
    check(
        &mut out,
        angle(&rh, &rk, &ra) < 170.0,
        "Bend your raised knee out to the side.",
    );
    check(&mut out, (lh.y - rh.y).abs() < 0.1, "Keep your hips level.");
    check(
        &mut out,
        distance(&lw, &rw) < 0.15 || (lw.y < lh.y && rw.y < rh.y),
        "Bring your hands to prayer or raise your arms.",
    );
    out
}

/// Left leg forward, right leg back.
pub(super) fn warrior(s: &Skeleton) -> Vec<String> {
    let (ls, rs) = (part(s, LeftShoulder), part(s, RightShoulder));
    let (lw, rw) = (part(s, LeftWrist), part(s, RightWrist));
    let (lh, rh) = (part(s, LeftHip), part(s, RightHip));
    let (lk, rk) = (part(s, LeftKnee), part(s, RightKnee));
    let (la, ra) = (part(s, LeftAnkle), part(s, RightAnkle));

    let front = angle(&lh, &lk, &la);
    let back = angle(&rh, &rk, &ra);
    let stance = foot_angle(&rh, &ra);

    let mut out = Vec::new();
    check(
        &mut out,
        front > 90.0 && front < 150.0,
        "Bend your front knee between 90 and 150 degrees.",
    );
    check(
        &mut out,
        (lk.x - la.x).abs() < 0.08,
        "Keep your front knee over your ankle.",
    );
    check(&mut out, (back - 180.0).abs() < 20.0, "Straighten your back leg.");
    check(
        &mut out,
        stance > 30.0 && stance < 60.0,
        "Turn your back foot out about 45 degrees.",
    );
    check(&mut out, (lw.y - rw.y).abs() < 0.1, "Keep your arms level.");
    check(
        &mut out,
        lw.y < ls.y && rw.y < rs.y,
        "Raise your arms to shoulder height.",
    );
    out
}

pub(super) fn downward_dog(s: &Skeleton) -> Vec<String> {
    let sh = part(s, LeftShoulder);
    let el = part(s, LeftElbow);
    let wr = part(s, LeftWrist);
    let hip = part(s, LeftHip);
    let knee = part(s, LeftKnee);
    let ank = part(s, LeftAnkle);

    let mut out = Vec::new();
    check(
        &mut out,
        (angle(&sh, &el, &wr) - 180.0).abs() < 15.0,
        "Straighten your arms.",
    );
    check(
        &mut out,
        (angle(&hip, &knee, &ank) - 180.0).abs() < 15.0,
        "Straighten your legs.",
    );
    check(
        &mut out,
        hip.y < sh.y && hip.y < ank.y,
        "Lift your hips to form an inverted V.",
    );
    out
}

pub(super) fn plank(s: &Skeleton) -> Vec<String> {
    let sh = part(s, LeftShoulder);
    let wr = part(s, LeftWrist);
    let hip = part(s, LeftHip);
    let ank = part(s, LeftAnkle);

    let mut out = Vec::new();
    check(
        &mut out,
        (angle(&sh, &hip, &ank) - 180.0).abs() < 15.0,
        "Keep your body in a straight line.",
    );
    check(
        &mut out,
        (sh.x - wr.x).abs() < 0.1,
        "Stack your shoulders over your wrists.",
    );
    check(
        &mut out,
        (hip.y - (sh.y + ank.y) / 2.0).abs() < 0.1,
        "Engage your core so your hips stay in line.",
    );
    out
}

pub(super) fn generic(s: &Skeleton) -> Vec<String> {
    let (ls, rs) = (part(s, LeftShoulder), part(s, RightShoulder));
    let width = distance(&ls, &rs);

    let mut out = Vec::new();
    check(
        &mut out,
        (ls.y - rs.y).abs() < 0.15,
        "Keep your shoulders level and balanced.",
    );
    check(
        &mut out,
        (ls.x - rs.x).abs() > 0.1,
        "Please face the camera directly.",
    );
    check(
        &mut out,
        width > 0.2 && width < 0.8,
        "Adjust your distance from the camera.",
    );
    out
}
