//! Exercise-tracking rules over pixel coordinates.
//!
//! Joint angles use [`angle_acos`]. Optional landmarks (hips for push-ups,
//! shoulders for tree balance, elbows for cobra, eyes for the generic check)
//! only gate their own check.

use super::part;
use crate::geometry::angle_acos;
use crate::landmark::{BodyPart::*, Skeleton};

pub(super) fn push_up(s: &Skeleton) -> Vec<String> {
    let mut out = Vec::new();
    let left = angle_acos(
        &part(s, LeftShoulder),
        &part(s, LeftElbow),
        &part(s, LeftWrist),
    );
    let right = angle_acos(
        &part(s, RightShoulder),
        &part(s, RightElbow),
        &part(s, RightWrist),
    );
    if !(70.0..=110.0).contains(&left) {
        out.push("Keep your left arm at a 90-degree angle.".to_string());
    }
    if !(70.0..=110.0).contains(&right) {
        out.push("Keep your right arm at a 90-degree angle.".to_string());
    }

    if let (Some(lh), Some(rh)) = (s.get(LeftHip), s.get(RightHip)) {
        let shoulder_y = (part(s, LeftShoulder).y + part(s, RightShoulder).y) / 2.0;
        let hip_y = (lh.y + rh.y) / 2.0;
        if (shoulder_y - hip_y).abs() > 50.0 {
            out.push("Keep your body in a straight line from head to heels.".to_string());
        }
    }
    out
}

pub(super) fn squat(s: &Skeleton) -> Vec<String> {
    let (lh, rh) = (part(s, LeftHip), part(s, RightHip));
    let (lk, rk) = (part(s, LeftKnee), part(s, RightKnee));
    let (la, ra) = (part(s, LeftAnkle), part(s, RightAnkle));

    let mut out = Vec::new();
    // One entry per leg, even when both say the same thing.
    for knee_angle in [angle_acos(&lh, &lk, &la), angle_acos(&rh, &rk, &ra)] {
        if knee_angle > 120.0 {
            out.push("Lower your body more - bend your knees further.".to_string());
        }
    }
    if lk.x < la.x {
        out.push("Keep your left knee behind your toes.".to_string());
    }
    if rk.x < ra.x {
        out.push("Keep your right knee behind your toes.".to_string());
    }
    out
}

/// Tree pose as judged by the tracking flow: one knee raised well above the other.
pub(super) fn tree_balance(s: &Skeleton) -> Vec<String> {
    let mut out = Vec::new();
    if (part(s, LeftKnee).y - part(s, RightKnee).y).abs() < 30.0 {
        out.push("Place one foot on the inner thigh of your standing leg.".to_string());
    }
    if let (Some(ls), Some(rs)) = (s.get(LeftShoulder), s.get(RightShoulder)) {
        if (ls.y - rs.y).abs() > 20.0 {
            out.push("Keep your shoulders level and balanced.".to_string());
        }
    }
    out
}

/// Compares raw image y values, which grow downward.
pub(super) fn cobra(s: &Skeleton) -> Vec<String> {
    let shoulder_y = (part(s, LeftShoulder).y + part(s, RightShoulder).y) / 2.0;
    let hip_y = (part(s, LeftHip).y + part(s, RightHip).y) / 2.0;

    let mut out = Vec::new();
    if shoulder_y <= hip_y {
        out.push("Lift your chest higher - arch your back more.".to_string());
    }
    if let (Some(le), Some(re)) = (s.get(LeftElbow), s.get(RightElbow)) {
        if (le.y + re.y) / 2.0 < shoulder_y {
            out.push("Keep your elbows close to your body.".to_string());
        }
    }
    out
}

pub(super) fn generic(s: &Skeleton) -> Vec<String> {
    let mut out = Vec::new();
    if let (Some(le), Some(re)) = (s.get(LeftEye), s.get(RightEye)) {
        // Facing the camera means the eyes are more than 30px apart.
        if (le.x - re.x).abs() <= 30.0 {
            out.push("Please face the camera directly.".to_string());
        }
    }
    out
}
