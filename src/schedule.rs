//! Weekly practice schedule from user preferences.
//!
//! Poses are scored against skill level and goals, then packed day by day by
//! taking turns between body-area groups so no single area dominates a day.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::path::Path;

use crate::catalog::{Catalog, PoseDefinition};

pub const BASE_POSE_SECS: f64 = 30.0;
pub const MAX_POSES_PER_DAY: usize = 20;
pub const MIN_POSES_PER_DAY: usize = 5;
pub const MAX_GOALS: usize = 3;

const FOCUS_AREAS: [&str; 7] = [
    "Balance & Stability",
    "Strength & Core",
    "Flexibility & Stretching",
    "Stress Relief & Mindfulness",
    "Posture & Alignment",
    "Energy & Vitality",
    "Full Body Flow",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl SkillLevel {
    fn duration_multiplier(self) -> f64 {
        match self {
            SkillLevel::Beginner => 0.8,
            SkillLevel::Intermediate => 1.2,
            SkillLevel::Advanced => 1.5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Goal {
    Flexibility,
    Strength,
    Balance,
    StressRelief,
    Posture,
    WeightLoss,
    Meditation,
    Energy,
    #[serde(other)]
    Other,
}

impl Goal {
    /// Body-area keywords that earn a point when a pose targets them.
    pub fn target_areas(self) -> &'static [&'static str] {
        match self {
            Goal::Flexibility => &["hamstrings", "hips", "back", "shoulders"],
            Goal::Strength => &["core", "legs", "arms", "glutes"],
            Goal::Balance => &["balance", "core", "legs", "ankles"],
            Goal::StressRelief => &["mindfulness", "breath", "relaxation", "shoulders", "back"],
            Goal::Posture => &["back", "shoulders", "spine", "neck"],
            Goal::WeightLoss => &["full body", "core", "legs", "cardio"],
            Goal::Meditation => &["mindfulness", "breath", "relaxation"],
            Goal::Energy => &["vitality", "full body"],
            Goal::Other => &[],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchedulePreferences {
    #[serde(default, alias = "skillLevel")]
    pub skill_level: Option<SkillLevel>,
    #[serde(alias = "sessionDuration")]
    pub session_duration_mins: u32,
    #[serde(default, alias = "availableDays")]
    pub available_days: Vec<String>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default, alias = "healthConditions")]
    pub health_conditions: String,
    #[serde(default, alias = "availableTime")]
    pub available_time: String,
}

impl SchedulePreferences {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read preferences {}: {}", path.display(), e))?;
        let prefs: Self = serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid preferences {}: {}", path.display(), e))?;
        prefs.validate()?;
        Ok(prefs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.session_duration_mins == 0 {
            return Err(anyhow!("session duration must be > 0 minutes"));
        }
        if self.goals.len() > MAX_GOALS {
            return Err(anyhow!(
                "at most {} goals may be selected, got {}",
                MAX_GOALS,
                self.goals.len()
            ));
        }
        Ok(())
    }

    fn has_goal(&self, goal: Goal) -> bool {
        self.goals.contains(&goal)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoredPose {
    pub pose: PoseDefinition,
    pub score: i32,
    pub duration_secs: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPose {
    pub pose_name: String,
    pub description: String,
    pub instructions: String,
    pub duration_secs: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub target_body_parts: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub day: String,
    pub focus_area: String,
    pub poses: Vec<ScheduledPose>,
    /// Rounded to the nearest minute.
    pub total_minutes: u32,
    pub benefits: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub days: Vec<DaySchedule>,
    pub recommendations: Vec<String>,
}

impl WeeklySchedule {
    /// Poses of one day, in order, ready to hand to a session.
    pub fn day_poses(&self, day: &str, catalog: &Catalog) -> Vec<PoseDefinition> {
        self.days
            .iter()
            .find(|d| d.day.eq_ignore_ascii_case(day))
            .map(|d| {
                d.poses
                    .iter()
                    .filter_map(|p| catalog.find_by_name(&p.pose_name).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Hold time for a skill level.
pub fn pose_duration(skill: Option<SkillLevel>) -> u32 {
    let multiplier = skill.map(SkillLevel::duration_multiplier).unwrap_or(1.0);
    (BASE_POSE_SECS * multiplier).round() as u32
}

/// Every pose with its score, best first. Equal scores keep catalog order.
pub fn score_poses(poses: &[PoseDefinition], prefs: &SchedulePreferences) -> Vec<ScoredPose> {
    let duration_secs = pose_duration(prefs.skill_level);
    let back_care = prefs.health_conditions.to_lowercase().contains("back");
    let mut scored: Vec<ScoredPose> = poses
        .iter()
        .map(|pose| {
            let name = pose.display_name().to_lowercase();
            let parts = pose.target_body_parts.to_lowercase();
            let mut score = 0;

            match prefs.skill_level {
                Some(SkillLevel::Beginner) => {
                    if ["mountain", "child", "bridge"].iter().any(|k| name.contains(k)) {
                        score += 2;
                    }
                }
                Some(SkillLevel::Intermediate) => {
                    if ["warrior", "downward", "triangle"].iter().any(|k| name.contains(k)) {
                        score += 2;
                    }
                }
                Some(SkillLevel::Advanced) => score += 1,
                None => {}
            }

            for goal in &prefs.goals {
                score += goal
                    .target_areas()
                    .iter()
                    .filter(|area| parts.contains(*area))
                    .count() as i32;
            }

            if prefs.has_goal(Goal::Balance) && name.contains("tree") {
                score += 2;
            }
            if prefs.has_goal(Goal::Flexibility) && name.contains("forward") {
                score += 1;
            }
            if prefs.has_goal(Goal::Strength) && (name.contains("plank") || name.contains("chair"))
            {
                score += 1;
            }
            if back_care && parts.contains("back") {
                score += 1;
            }

            ScoredPose {
                pose: pose.clone(),
                score,
                duration_secs,
            }
        })
        .collect();
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

fn group_key(target_body_parts: &str) -> &'static str {
    let parts = target_body_parts.to_lowercase();
    ["back", "core", "legs", "hips", "shoulders"]
        .into_iter()
        .find(|key| parts.contains(key))
        .unwrap_or("other")
}

/// Pack one day by rotating through the body-area groups, starting at a
/// group offset by the day index.
fn pack_day(scored: &[ScoredPose], day_index: usize, session_secs: u32) -> Vec<&ScoredPose> {
    let mut groups: Vec<(&str, VecDeque<&ScoredPose>)> = Vec::new();
    for pose in scored {
        let key = group_key(&pose.pose.target_body_parts);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, group)) => group.push_back(pose),
            None => groups.push((key, VecDeque::from([pose]))),
        }
    }
    for (_, group) in groups.iter_mut() {
        group.make_contiguous().sort_by(|a, b| b.score.cmp(&a.score));
    }

    let mut day = Vec::new();
    if groups.is_empty() {
        return day;
    }
    let mut seen = HashSet::new();
    let mut total = 0u32;
    let mut k = day_index % groups.len();
    let mut attempts = 0usize;
    let max_attempts = (scored.len() * 20).max(1_000);

    while day.len() < MAX_POSES_PER_DAY
        && attempts < max_attempts
        && (total < session_secs || day.len() < MIN_POSES_PER_DAY)
    {
        let slot = k % groups.len();
        if let Some(pose) = groups[slot].1.pop_front() {
            let fits = total + pose.duration_secs <= session_secs;
            let below_minimum = day.len() < MIN_POSES_PER_DAY;
            if !seen.contains(pose.pose.id.as_str()) && (fits || below_minimum) {
                seen.insert(pose.pose.id.as_str());
                total += pose.duration_secs;
                day.push(pose);
            }
        }
        k += 1;
        attempts += 1;
    }
    day
}

pub fn focus_area(day_index: usize) -> &'static str {
    FOCUS_AREAS[day_index % FOCUS_AREAS.len()]
}

pub fn focus_benefits(area: &str) -> &'static str {
    match area {
        "Balance & Stability" => "Improves coordination, core strength, and mental focus",
        "Strength & Core" => "Builds muscle tone, enhances posture, and increases metabolism",
        "Flexibility & Stretching" => {
            "Increases range of motion, reduces muscle tension, and prevents injuries"
        }
        "Stress Relief & Mindfulness" => {
            "Reduces anxiety, improves sleep, and enhances mental clarity"
        }
        "Posture & Alignment" => "Corrects posture, relieves back pain, and improves breathing",
        "Energy & Vitality" => "Boosts energy levels, improves circulation, and enhances mood",
        "Full Body Flow" => "Comprehensive workout targeting all major muscle groups",
        _ => "Promotes overall health and wellness",
    }
}

pub fn plan_week(scored: &[ScoredPose], prefs: &SchedulePreferences) -> Vec<DaySchedule> {
    let session_secs = prefs.session_duration_mins * 60;
    prefs
        .available_days
        .iter()
        .enumerate()
        .map(|(index, day)| {
            let picked = pack_day(scored, index, session_secs);
            let total: u32 = picked.iter().map(|p| p.duration_secs).sum();
            let area = focus_area(index);
            DaySchedule {
                day: day.clone(),
                focus_area: area.to_string(),
                poses: picked
                    .into_iter()
                    .map(|p| ScheduledPose {
                        pose_name: p.pose.display_name().to_string(),
                        description: p.pose.description.clone(),
                        instructions: p.pose.instructions.clone(),
                        duration_secs: p.duration_secs,
                        image_url: p.pose.image_url.clone(),
                        target_body_parts: p.pose.target_body_parts.clone(),
                    })
                    .collect(),
                total_minutes: (f64::from(total) / 60.0).round() as u32,
                benefits: focus_benefits(area).to_string(),
            }
        })
        .collect()
}

pub fn recommendations(prefs: &SchedulePreferences) -> Vec<String> {
    let mut out = vec![format!(
        "Practice at your preferred time: {}",
        prefs.available_time
    )];
    let lines: [&str; 2] = match prefs.skill_level {
        Some(SkillLevel::Beginner) => [
            "Start with gentle poses and gradually increase intensity",
            "Focus on proper breathing and alignment",
        ],
        Some(SkillLevel::Intermediate) => [
            "Challenge yourself with more complex poses",
            "Maintain consistency in your practice",
        ],
        _ => [
            "Explore advanced variations and longer holds",
            "Consider adding meditation to your routine",
        ],
    };
    out.extend(lines.iter().map(|s| s.to_string()));
    if prefs.has_goal(Goal::StressRelief) {
        out.push("Include 5-10 minutes of meditation or deep breathing".to_string());
    }
    if prefs.has_goal(Goal::Flexibility) {
        out.push("Hold poses longer and practice regularly for best results".to_string());
    }
    out
}

pub fn generate_schedule(catalog: &Catalog, prefs: &SchedulePreferences) -> Result<WeeklySchedule> {
    prefs.validate()?;
    if catalog.is_empty() {
        return Err(anyhow!("No yoga poses available"));
    }
    let scored = score_poses(catalog.poses(), prefs);
    let days = plan_week(&scored, prefs);
    log::info!(
        "schedule: {} days from {} poses",
        days.len(),
        catalog.len()
    );
    Ok(WeeklySchedule {
        days,
        recommendations: recommendations(prefs),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs(skill: Option<SkillLevel>, minutes: u32, goals: Vec<Goal>) -> SchedulePreferences {
        SchedulePreferences {
            skill_level: skill,
            session_duration_mins: minutes,
            available_days: vec!["Monday".into(), "Wednesday".into(), "Friday".into()],
            goals,
            health_conditions: String::new(),
            available_time: "morning".into(),
        }
    }

    #[test]
    fn durations_scale_with_skill() {
        assert_eq!(pose_duration(Some(SkillLevel::Beginner)), 24);
        assert_eq!(pose_duration(Some(SkillLevel::Intermediate)), 36);
        assert_eq!(pose_duration(Some(SkillLevel::Advanced)), 45);
        assert_eq!(pose_duration(None), 30);
    }

    #[test]
    fn balance_goal_puts_tree_first() {
        let library = Catalog::builtin_library();
        let scored = score_poses(
            library.poses(),
            &prefs(Some(SkillLevel::Beginner), 10, vec![Goal::Balance]),
        );
        assert_eq!(scored[0].pose.name, "Tree Pose");
        assert_eq!(scored[0].score, 5);
        // Ties keep catalog order.
        assert_eq!(scored[1].pose.name, "Mountain Pose");
        assert_eq!(scored[2].pose.name, "Warrior II");
        assert!(scored.iter().all(|p| p.duration_secs == 24));
    }

    #[test]
    fn back_condition_adds_a_point() {
        let library = Catalog::builtin_library();
        let mut p = prefs(Some(SkillLevel::Beginner), 10, Vec::new());
        p.health_conditions = "Lower BACK pain".into();
        let scored = score_poses(library.poses(), &p);
        let bridge = scored.iter().find(|s| s.pose.name == "Bridge Pose").unwrap();
        assert_eq!(bridge.score, 3);
    }

    #[test]
    fn short_sessions_still_get_minimum_poses() {
        let schedule = generate_schedule(
            &Catalog::builtin_library(),
            &prefs(None, 1, vec![Goal::Strength]),
        )
        .unwrap();
        assert_eq!(schedule.days.len(), 3);
        for day in &schedule.days {
            assert_eq!(day.poses.len(), MIN_POSES_PER_DAY);
            let names: HashSet<_> = day.poses.iter().map(|p| &p.pose_name).collect();
            assert_eq!(names.len(), day.poses.len());
            assert_eq!(day.total_minutes, 3);
        }
        assert_eq!(schedule.days[0].focus_area, "Balance & Stability");
        assert_eq!(schedule.days[1].focus_area, "Strength & Core");
        assert_eq!(
            schedule.days[2].benefits,
            "Increases range of motion, reduces muscle tension, and prevents injuries"
        );
    }

    #[test]
    fn days_stay_within_session_once_minimum_met() {
        let schedule = generate_schedule(
            &Catalog::builtin_library(),
            &prefs(Some(SkillLevel::Intermediate), 5, Vec::new()),
        )
        .unwrap();
        for day in &schedule.days {
            assert_eq!(day.poses.len(), 8);
            assert_eq!(day.total_minutes, 5);
        }
    }

    #[test]
    fn long_sessions_cap_at_twenty() {
        let schedule = generate_schedule(
            &Catalog::builtin_library(),
            &prefs(Some(SkillLevel::Advanced), 60, Vec::new()),
        )
        .unwrap();
        assert_eq!(schedule.days[0].poses.len(), MAX_POSES_PER_DAY);
        assert_eq!(schedule.days[0].total_minutes, 15);
    }

    #[test]
    fn day_rotation_starts_at_different_groups() {
        let schedule = generate_schedule(
            &Catalog::builtin_library(),
            &prefs(None, 1, Vec::new()),
        )
        .unwrap();
        assert_ne!(
            schedule.days[0].poses[0].pose_name,
            schedule.days[1].poses[0].pose_name
        );
    }

    #[test]
    fn recommendations_follow_skill_and_goals() {
        let recs = recommendations(&prefs(
            Some(SkillLevel::Intermediate),
            20,
            vec![Goal::Flexibility, Goal::StressRelief],
        ));
        assert_eq!(
            recs,
            vec![
                "Practice at your preferred time: morning",
                "Challenge yourself with more complex poses",
                "Maintain consistency in your practice",
                "Include 5-10 minutes of meditation or deep breathing",
                "Hold poses longer and practice regularly for best results",
            ]
        );
    }

    #[test]
    fn preferences_accept_camel_case_and_unknown_goals() {
        let raw = r#"{"skillLevel":"advanced","sessionDuration":30,
            "availableDays":["Sat"],"goals":["balance","juggling"],"availableTime":"evening"}"#;
        let p: SchedulePreferences = serde_json::from_str(raw).unwrap();
        assert_eq!(p.skill_level, Some(SkillLevel::Advanced));
        assert_eq!(p.goals, vec![Goal::Balance, Goal::Other]);
        p.validate().unwrap();

        let too_many = SchedulePreferences {
            goals: vec![Goal::Balance, Goal::Energy, Goal::Posture, Goal::Strength],
            ..p
        };
        assert!(too_many.validate().is_err());
    }
}
