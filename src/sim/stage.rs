//! Experience stages
//!
//! The experience moves strictly forward through a fixed ordering.

use serde::{Deserialize, Serialize};

/// One discrete phase of the scripted experience
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExperienceStage {
    /// Pop the balloons, then open the box
    Landing,
    /// Intro message typed out character by character
    IntroAnimation,
    /// "Take a deep breath" confirmation
    InteractiveCheck,
    /// Spin the wheel
    Wheel,
    /// Blow out the candles
    Candles,
    /// Drag the knife to the cake
    CakeCutting,
    /// Hidden messages revealed
    Reveal,
    /// Viewer left the reveal screen
    Ending,
}

impl ExperienceStage {
    /// All stages in experience order
    pub const ALL: [ExperienceStage; 8] = [
        ExperienceStage::Landing,
        ExperienceStage::IntroAnimation,
        ExperienceStage::InteractiveCheck,
        ExperienceStage::Wheel,
        ExperienceStage::Candles,
        ExperienceStage::CakeCutting,
        ExperienceStage::Reveal,
        ExperienceStage::Ending,
    ];

    /// The stage that follows this one, if any
    pub fn next(self) -> Option<ExperienceStage> {
        use ExperienceStage::*;
        match self {
            Landing => Some(IntroAnimation),
            IntroAnimation => Some(InteractiveCheck),
            InteractiveCheck => Some(Wheel),
            Wheel => Some(Candles),
            Candles => Some(CakeCutting),
            CakeCutting => Some(Reveal),
            Reveal => Some(Ending),
            Ending => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        use ExperienceStage::*;
        match self {
            Landing => "landing",
            IntroAnimation => "intro",
            InteractiveCheck => "check",
            Wheel => "wheel",
            Candles => "candles",
            CakeCutting => "cutting",
            Reveal => "reveal",
            Ending => "ending",
        }
    }
}

impl std::fmt::Display for ExperienceStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
