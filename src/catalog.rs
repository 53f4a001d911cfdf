//! Pose and exercise reference data.
//!
//! Definitions are immutable once loaded. Every yoga definition is tagged with
//! a [`PoseKind`] at load time so the evaluator dispatches on the tag instead
//! of re-matching display names each cycle.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::classify::Classifier;

pub const DEFAULT_POSE_DURATION_SECS: u32 = 30;

/// Yoga pose family, selected by display-name keyword.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseKind {
    Mountain,
    Tree,
    Warrior,
    DownwardDog,
    Plank,
    #[default]
    Generic,
}

impl PoseKind {
    /// Case-insensitive keyword match, first hit wins:
    /// mountain, tree, warrior, downward, plank, else generic.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        const KEYWORDS: [(&str, PoseKind); 5] = [
            ("mountain", PoseKind::Mountain),
            ("tree", PoseKind::Tree),
            ("warrior", PoseKind::Warrior),
            ("downward", PoseKind::DownwardDog),
            ("plank", PoseKind::Plank),
        ];
        KEYWORDS
            .iter()
            .find(|(keyword, _)| lower.contains(keyword))
            .map(|(_, kind)| *kind)
            .unwrap_or(PoseKind::Generic)
    }

    pub fn classifier(self) -> Classifier {
        match self {
            PoseKind::Mountain => Classifier::Mountain,
            PoseKind::Tree => Classifier::Tree,
            PoseKind::Warrior => Classifier::Warrior,
            PoseKind::DownwardDog => Classifier::DownwardDog,
            PoseKind::Plank => Classifier::Plank,
            PoseKind::Generic => Classifier::AlignmentGeneric,
        }
    }

    /// Shown when the pose is judged correct.
    pub fn praise(self) -> &'static str {
        match self {
            PoseKind::Mountain => "Perfect Mountain Pose!",
            PoseKind::Tree => "Excellent balance!",
            PoseKind::Warrior => "Strong Warrior stance!",
            PoseKind::DownwardDog => "Great Downward Dog!",
            PoseKind::Plank => "Solid Plank position!",
            PoseKind::Generic => "Pose looks good!",
        }
    }

    /// Summary of the pose's alignment cues.
    pub fn cue(self) -> &'static str {
        match self {
            PoseKind::Mountain => "Stand tall, feet together, shoulders relaxed, arms by sides",
            PoseKind::Tree => "Focus on a point, engage core, foot to inner thigh, arms in prayer",
            PoseKind::Warrior => "Front knee over ankle, back leg straight, arms parallel and raised",
            PoseKind::DownwardDog => "Press through hands, lift hips, straighten legs, form inverted V",
            PoseKind::Plank => "Engage core, keep body straight, shoulders over wrists",
            PoseKind::Generic => "Adjust your alignment and breathing",
        }
    }

    pub fn benefits(self) -> &'static str {
        match self {
            PoseKind::Mountain => {
                "Improves posture, strengthens thighs, and promotes grounding and stability"
            }
            PoseKind::Tree => {
                "Enhances balance, strengthens legs, and improves concentration and focus"
            }
            PoseKind::Warrior => {
                "Builds strength in legs, improves balance, and increases stamina and confidence"
            }
            PoseKind::DownwardDog => {
                "Stretches hamstrings, strengthens arms, and relieves back tension"
            }
            PoseKind::Plank => "Strengthens core, improves posture, and builds overall body strength",
            PoseKind::Generic => "Promotes flexibility, strength, and mental focus",
        }
    }

    /// What the rule set checks, for the help request.
    pub fn help(self) -> &'static str {
        match self {
            PoseKind::Mountain => {
                "Shoulders level, head centered, hips level, arms relaxed by sides, standing straight"
            }
            PoseKind::Tree => {
                "Standing leg straight, raised foot on inner thigh/calf, raised knee bent, hips level, arms in prayer or raised"
            }
            PoseKind::Warrior => {
                "Front knee bent over ankle, back leg straight, back foot turned out, arms parallel and raised"
            }
            PoseKind::DownwardDog => {
                "Arms straight, legs straight, hips elevated, forming inverted V shape"
            }
            PoseKind::Plank => {
                "Body straight line, shoulders over wrists, core engaged, hips aligned"
            }
            PoseKind::Generic => "Basic pose quality, balance, and alignment",
        }
    }
}

fn default_duration() -> u32 {
    DEFAULT_POSE_DURATION_SECS
}

/// One catalog entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseDefinition {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub english_name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub benefits: String,
    #[serde(default = "default_duration")]
    pub duration_secs: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Comma-separated body areas, e.g. `"hamstrings, shoulders, back"`.
    #[serde(default)]
    pub target_body_parts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<PoseKind>,
}

impl PoseDefinition {
    pub fn new(id: &str, name: &str) -> Self {
        let mut def = Self {
            id: id.to_string(),
            name: name.to_string(),
            english_name: None,
            description: String::new(),
            instructions: String::new(),
            benefits: String::new(),
            duration_secs: DEFAULT_POSE_DURATION_SECS,
            reps: None,
            image_url: None,
            target_body_parts: String::new(),
            kind: None,
        };
        def.tag();
        def
    }

    /// English name when the catalog has one, else the primary name.
    pub fn display_name(&self) -> &str {
        self.english_name.as_deref().unwrap_or(&self.name)
    }

    pub fn kind(&self) -> PoseKind {
        self.kind
            .unwrap_or_else(|| PoseKind::from_name(self.display_name()))
    }

    /// Instructions, falling back to the description.
    pub fn guidance(&self) -> &str {
        if self.instructions.is_empty() {
            &self.description
        } else {
            &self.instructions
        }
    }

    fn tag(&mut self) {
        if self.kind.is_none() {
            self.kind = Some(PoseKind::from_name(self.display_name()));
        }
    }

    fn with_text(mut self, description: &str, instructions: &str, target_body_parts: &str) -> Self {
        self.description = description.to_string();
        self.instructions = instructions.to_string();
        self.target_body_parts = target_body_parts.to_string();
        self
    }
}

/// `"Child's Pose"` -> `"childs-pose"`.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if (ch.is_whitespace() || ch == '-' || ch == '_') && !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    poses: Vec<PoseDefinition>,
}

/// Ordered, id-unique set of definitions.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    poses: Vec<PoseDefinition>,
}

impl Catalog {
    /// Validates ids and tags every entry with its pose kind.
    pub fn new(poses: Vec<PoseDefinition>) -> Result<Self> {
        let mut seen = HashSet::new();
        for pose in &poses {
            crate::validate_pose_id(&pose.id)?;
            if !seen.insert(pose.id.as_str()) {
                return Err(anyhow!("duplicate pose id '{}' in catalog", pose.id));
            }
        }
        Ok(Self::tagged(poses))
    }

    fn tagged(mut poses: Vec<PoseDefinition>) -> Self {
        for pose in &mut poses {
            pose.tag();
        }
        Self { poses }
    }

    /// Load a catalog file: TOML when the extension is `.toml`, JSON otherwise.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read catalog {}: {}", path.display(), e))?;
        let file: CatalogFile = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&raw)
                .map_err(|e| anyhow!("invalid catalog {}: {}", path.display(), e))?,
            _ => serde_json::from_str(&raw)
                .map_err(|e| anyhow!("invalid catalog {}: {}", path.display(), e))?,
        };
        let catalog = Self::new(file.poses)?;
        log::info!(
            "loaded {} poses from catalog {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn get(&self, id: &str) -> Option<&PoseDefinition> {
        self.poses.iter().find(|pose| pose.id == id)
    }

    /// Case-insensitive lookup by primary or English name.
    pub fn find_by_name(&self, name: &str) -> Option<&PoseDefinition> {
        let needle = name.to_lowercase();
        self.poses.iter().find(|pose| {
            pose.name.to_lowercase() == needle
                || pose
                    .english_name
                    .as_deref()
                    .is_some_and(|english| english.to_lowercase() == needle)
        })
    }

    pub fn poses(&self) -> &[PoseDefinition] {
        &self.poses
    }

    pub fn iter(&self) -> impl Iterator<Item = &PoseDefinition> {
        self.poses.iter()
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn into_poses(self) -> Vec<PoseDefinition> {
        self.poses
    }

    /// Schedule library used when no catalog file is configured.
    pub fn builtin_library() -> Self {
        const LIBRARY: [(&str, &str, &str, &str, &str); 20] = [
            ("Mountain Pose", "Stand tall with feet together.", "Engage thighs, lift chest, relax shoulders.", "full body, posture", "Mountain+Pose"),
            ("Downward-Facing Dog", "Inverted V shape.", "Press through hands, lift hips back and up.", "hamstrings, shoulders, back", "Downward+Dog"),
            ("Warrior II", "Wide stance, front knee bent.", "Arms parallel to floor, gaze front hand.", "legs, hips, core", "Warrior+II"),
            ("Tree Pose", "Single-leg balance.", "Foot to inner thigh/calf, hands at heart.", "balance, legs, core", "Tree+Pose"),
            ("Triangle Pose", "Lateral stretch.", "Hinge at hip, top arm to sky.", "hamstrings, hips, shoulders", "Triangle"),
            ("Plank", "Top of push-up.", "Engage core, neutral spine.", "core, shoulders, arms", "Plank"),
            ("Bridge Pose", "Backbend on shoulders.", "Press feet, lift hips.", "back, glutes, hamstrings", "Bridge"),
            ("Child's Pose", "Resting fold.", "Hips to heels, arms forward.", "back, hips, relaxation", "Child%27s+Pose"),
            ("Cobra Pose", "Gentle backbend.", "Elbows in, lift chest.", "back, shoulders", "Cobra"),
            ("Cat-Cow", "Spinal articulation.", "Alternate arch and round.", "spine, back", "Cat-Cow"),
            ("Chair Pose", "Squat-like hold.", "Knees bend, chest lifts.", "legs, core", "Chair"),
            ("Boat Pose", "V-sit balance.", "Lift legs and chest, core tight.", "core, hip flexors", "Boat"),
            ("Pigeon Pose", "Hip opener.", "Shin forward, extend back leg.", "hips, glutes", "Pigeon"),
            ("Seated Forward Bend", "Hamstring stretch.", "Hinge from hips to fold.", "hamstrings, back", "Forward+Bend"),
            ("Camel Pose", "Kneeling backbend.", "Hands to heels, lift chest.", "back, chest, hips", "Camel"),
            ("Side Plank", "Lateral plank.", "Stack feet, lift hips.", "core, shoulders, obliques", "Side+Plank"),
            ("Extended Side Angle", "Side body length.", "Front knee bent, top arm overhead.", "legs, hips, side body", "Side+Angle"),
            ("Low Lunge", "Hip flexor stretch.", "Front knee over ankle.", "hips, legs", "Low+Lunge"),
            ("High Lunge", "Dynamic lunge.", "Back leg engaged, chest up.", "legs, hips, balance", "High+Lunge"),
            ("Cow Face Pose", "Shoulder/hip opener.", "Arms bind, knees stacked.", "shoulders, hips", "Cow+Face"),
        ];
        let poses = LIBRARY
            .iter()
            .map(|(name, description, instructions, parts, label)| {
                let mut pose = PoseDefinition::new(&slugify(name), name)
                    .with_text(description, instructions, parts);
                pose.image_url = Some(format!("https://placehold.co/400x250?text={label}"));
                pose
            })
            .collect();
        Self::tagged(poses)
    }

    /// Exercise-tracking catalog, keyed by the exercise ids the evaluator knows.
    pub fn builtin_exercises() -> Self {
        const EXERCISES: [(&str, &str, &str, &str, &str, u32); 4] = [
            ("pushups", "Push-ups", "Upper body strength exercise", "Keep your body straight, lower until chest nearly touches ground, push back up", "chest, triceps, shoulders", 10),
            ("squats", "Squats", "Lower body strength exercise", "Stand with feet shoulder-width apart, lower hips back and down, keep chest up", "quadriceps, glutes, hamstrings", 15),
            ("planks", "Planks", "Core stability exercise", "Hold body in straight line from head to heels, engage core muscles", "core, shoulders, back", 30),
            ("burpees", "Burpees", "Full body cardio exercise", "Squat down, jump back to plank, do push-up, jump forward, jump up", "full body, cardio", 8),
        ];
        let poses = EXERCISES
            .iter()
            .map(|(id, name, description, instructions, parts, reps)| {
                let mut pose =
                    PoseDefinition::new(id, name).with_text(description, instructions, parts);
                pose.reps = Some(*reps);
                pose
            })
            .collect();
        Self::tagged(poses)
    }

    /// Yoga poses followed by the tracking flow.
    pub fn builtin_yoga() -> Self {
        const YOGA: [(&str, &str, &str, &str, &str, u32, &str); 12] = [
            ("vrikshasana", "Vrikshasana", "Tree Pose", "Improves balance, strengthens legs, enhances focus", "Stand on one leg, place other foot on inner thigh, bring hands to prayer position", 30, "Tree Pose - Improves balance and focus"),
            ("bhujangasana", "Bhujangasana", "Cobra Pose", "Strengthens spine, stretches chest, lungs, shoulders", "Lie on stomach, place hands under shoulders, lift chest while keeping pelvis on ground", 20, "Cobra Pose - Strengthens spine and opens chest"),
            ("adho-mukha", "Adho Mukha Svanasana", "Downward Dog", "Stretches hamstrings, strengthens arms and shoulders", "Form inverted V-shape with body, press hands and feet into ground", 25, "Downward Dog - Stretches and strengthens entire body"),
            ("tadasana", "Tadasana", "Mountain Pose", "Improves posture, strengthens thighs and core", "Stand tall with feet together, arms at sides, engage leg muscles", 15, "Mountain Pose - Foundation for all standing poses"),
            ("uttanasana", "Uttanasana", "Forward Bend", "Stretches spine, hamstrings, and hips", "Stand with feet together, fold forward from hips, let head hang", 20, "Forward Bend - Stretches back and hamstrings"),
            ("ashwa-sanchalanasana", "Ashwa Sanchalanasana", "Lunge Pose", "Strengthens legs, improves balance, opens hips", "Step one foot back, lower back knee, keep front knee over ankle", 25, "Lunge Pose - Strengthens legs and improves balance"),
            ("parvatasana", "Parvatasana", "Plank Pose", "Builds core strength, improves posture, strengthens shoulders", "Hold body in straight line, engage core, keep shoulders over wrists", 30, "Plank Pose - Builds core strength and stability"),
            ("ashtanga-namaskara", "Ashtanga Namaskara", "Eight Limb Pose", "Strengthens arms and core, improves flexibility", "Lower body to ground, touch 8 points: feet, knees, hands, chest, chin", 15, "Eight Limb Pose - Part of sun salutation sequence"),
            ("urdhva-mukha", "Urdhva Mukha Svanasana", "Upward Dog", "Opens chest, strengthens back, improves posture", "Lift chest and legs off ground, arch back, look up", 20, "Upward Dog - Opens chest and strengthens back"),
            ("balasana", "Balasana", "Child's Pose", "Relaxes back, stretches hips, calms mind", "Kneel on ground, sit back on heels, fold forward, arms extended", 30, "Child's Pose - Restorative and calming pose"),
            ("sarvangasana", "Sarvangasana", "Shoulder Stand", "Improves circulation, strengthens shoulders and core", "Lie on back, lift legs and hips up, support back with hands", 45, "Shoulder Stand - Advanced inversion pose"),
            ("savasana", "Savasana", "Corpse Pose", "Relaxes entire body, reduces stress, improves sleep", "Lie on back, arms at sides, close eyes, relax completely", 60, "Corpse Pose - Final relaxation pose"),
        ];
        let poses = YOGA
            .iter()
            .map(
                |(id, name, english, benefits, instructions, duration, description)| {
                    let mut pose = PoseDefinition::new(id, name);
                    pose.english_name = Some(english.to_string());
                    pose.benefits = benefits.to_string();
                    pose.instructions = instructions.to_string();
                    pose.description = description.to_string();
                    pose.duration_secs = *duration;
                    pose.kind = None;
                    pose
                },
            )
            .collect();
        Self::tagged(poses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn kind_matching_honours_priority() {
        assert_eq!(PoseKind::from_name("Mountain Pose"), PoseKind::Mountain);
        assert_eq!(PoseKind::from_name("WARRIOR II"), PoseKind::Warrior);
        assert_eq!(PoseKind::from_name("Downward-Facing Dog"), PoseKind::DownwardDog);
        assert_eq!(PoseKind::from_name("Side Plank"), PoseKind::Plank);
        // "mountain" outranks "tree" when both appear.
        assert_eq!(PoseKind::from_name("Tree on a mountain"), PoseKind::Mountain);
        assert_eq!(PoseKind::from_name("Pigeon Pose"), PoseKind::Generic);
    }

    #[test]
    fn builtins_have_valid_unique_ids() {
        for catalog in [
            Catalog::builtin_library(),
            Catalog::builtin_exercises(),
            Catalog::builtin_yoga(),
        ] {
            let rebuilt = Catalog::new(catalog.poses().to_vec()).unwrap();
            assert_eq!(rebuilt.len(), catalog.len());
        }
        let library = Catalog::builtin_library();
        assert_eq!(library.len(), 20);
        assert_eq!(library.get("childs-pose").unwrap().name, "Child's Pose");
    }

    #[test]
    fn english_names_drive_the_kind_tag() {
        let yoga = Catalog::builtin_yoga();
        assert_eq!(yoga.get("tadasana").unwrap().kind(), PoseKind::Mountain);
        assert_eq!(yoga.get("adho-mukha").unwrap().kind(), PoseKind::DownwardDog);
        assert_eq!(yoga.get("balasana").unwrap().kind(), PoseKind::Generic);
        assert!(yoga.find_by_name("cobra pose").is_some());
    }

    #[test]
    fn rejects_bad_and_duplicate_ids() {
        let bad = PoseDefinition::new("Has Spaces", "Bad");
        assert!(Catalog::new(vec![bad]).is_err());
        let dup = vec![
            PoseDefinition::new("tree", "Tree Pose"),
            PoseDefinition::new("tree", "Tree Pose"),
        ];
        assert!(Catalog::new(dup).is_err());
    }

    #[test]
    fn loads_toml_and_json_files() {
        let mut toml_file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            toml_file,
            r#"
[[poses]]
id = "warrior-2"
name = "Warrior II"
instructions = "Arms parallel to floor."

[[poses]]
id = "pigeon"
name = "Pigeon Pose"
duration_secs = 45
"#
        )
        .unwrap();
        let catalog = Catalog::load(toml_file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("warrior-2").unwrap().kind(), PoseKind::Warrior);
        assert_eq!(catalog.get("pigeon").unwrap().duration_secs, 45);
        assert_eq!(
            catalog.get("warrior-2").unwrap().duration_secs,
            DEFAULT_POSE_DURATION_SECS
        );

        let mut json_file = tempfile::NamedTempFile::new().unwrap();
        write!(
            json_file,
            r#"{{"poses":[{{"id":"plank","name":"Plank","kind":"generic"}}]}}"#
        )
        .unwrap();
        let catalog = Catalog::load(json_file.path()).unwrap();
        // An explicit tag wins over the name.
        assert_eq!(catalog.get("plank").unwrap().kind(), PoseKind::Generic);
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("Child's Pose"), "childs-pose");
        assert_eq!(slugify("Warrior II"), "warrior-ii");
        assert_eq!(slugify("Cat-Cow"), "cat-cow");
        assert_eq!(slugify("Downward-Facing Dog"), "downward-facing-dog");
    }
}
