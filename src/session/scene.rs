// src/session/scene.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Screens of the funnel, in the order a participant walks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scene {
    Welcome,
    Registration,
    SqlTutorial,
    Quiz1Cover,
    Quiz1Q1,
    Quiz1Q2,
    Quiz1Q3,
    Quiz1Q4,
    Quiz1Q5,
    Quiz2Cover,
    Quiz2Q1,
    Quiz2Q2,
    Quiz2Q3,
    Quiz2Q4,
    Quiz2Q5,
    Quiz3Cover,
    Quiz3Q1,
    Quiz3Q2,
    Quiz3Q3,
    Quiz3Q4,
    EssayCover,
    Essay1,
    Essay2,
    Closing,
}

const ORDER: [Scene; 24] = [
    Scene::Welcome,
    Scene::Registration,
    Scene::SqlTutorial,
    Scene::Quiz1Cover,
    Scene::Quiz1Q1,
    Scene::Quiz1Q2,
    Scene::Quiz1Q3,
    Scene::Quiz1Q4,
    Scene::Quiz1Q5,
    Scene::Quiz2Cover,
    Scene::Quiz2Q1,
    Scene::Quiz2Q2,
    Scene::Quiz2Q3,
    Scene::Quiz2Q4,
    Scene::Quiz2Q5,
    Scene::Quiz3Cover,
    Scene::Quiz3Q1,
    Scene::Quiz3Q2,
    Scene::Quiz3Q3,
    Scene::Quiz3Q4,
    Scene::EssayCover,
    Scene::Essay1,
    Scene::Essay2,
    Scene::Closing,
];

impl Scene {
    /// Where a session lands once registration succeeds.
    pub const AFTER_REGISTRATION: Scene = Scene::SqlTutorial;

    fn position(self) -> usize {
        ORDER.iter().position(|s| *s == self).unwrap_or(0)
    }

    /// The following screen. `None` on the closing screen.
    pub fn next(self) -> Option<Scene> {
        ORDER.get(self.position() + 1).copied()
    }

    /// The previous screen, if the funnel allows stepping back from here.
    /// Welcome, registration and closing have no way back.
    pub fn back(self) -> Option<Scene> {
        match self {
            Scene::Welcome | Scene::Registration | Scene::Closing => None,
            other => ORDER.get(other.position().checked_sub(1)?).copied(),
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Scene::Closing
    }

    /// Wire name, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            Scene::Welcome => "welcome",
            Scene::Registration => "registration",
            Scene::SqlTutorial => "sqlTutorial",
            Scene::Quiz1Cover => "quiz1Cover",
            Scene::Quiz1Q1 => "quiz1Q1",
            Scene::Quiz1Q2 => "quiz1Q2",
            Scene::Quiz1Q3 => "quiz1Q3",
            Scene::Quiz1Q4 => "quiz1Q4",
            Scene::Quiz1Q5 => "quiz1Q5",
            Scene::Quiz2Cover => "quiz2Cover",
            Scene::Quiz2Q1 => "quiz2Q1",
            Scene::Quiz2Q2 => "quiz2Q2",
            Scene::Quiz2Q3 => "quiz2Q3",
            Scene::Quiz2Q4 => "quiz2Q4",
            Scene::Quiz2Q5 => "quiz2Q5",
            Scene::Quiz3Cover => "quiz3Cover",
            Scene::Quiz3Q1 => "quiz3Q1",
            Scene::Quiz3Q2 => "quiz3Q2",
            Scene::Quiz3Q3 => "quiz3Q3",
            Scene::Quiz3Q4 => "quiz3Q4",
            Scene::EssayCover => "essayCover",
            Scene::Essay1 => "essay1",
            Scene::Essay2 => "essay2",
            Scene::Closing => "closing",
        }
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
