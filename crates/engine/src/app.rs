//! Application state and composition.

use std::sync::Arc;

use faramita_domain::WorldState;

use crate::infrastructure::{
    clock::{SystemClock, SystemRandom},
    config::AppConfig,
    ports::{ClockPort, LlmPort, RandomPort},
};
use crate::stores::{ChronicleStore, WorldStore};
use crate::use_cases::{self, ChatOps, ChatSettings, DiceOps};

/// Main application state.
///
/// Holds the stores and use cases for the single shared session.
/// Passed to HTTP handlers via Axum state.
pub struct App {
    pub use_cases: use_cases::UseCases,
    pub chronicle: Arc<ChronicleStore>,
    pub world: Arc<WorldStore>,
}

impl App {
    /// Wire the app with the system clock and random source.
    pub fn new(config: &AppConfig, llm: Arc<dyn LlmPort>, world: WorldState) -> Self {
        let settings = ChatSettings {
            history_window: config.history_window,
            response_mode: config.response_mode,
            temperature: config.llm.temperature,
            max_tokens: None,
        };
        Self::with_ports(
            settings,
            llm,
            world,
            Arc::new(SystemClock::new()),
            Arc::new(SystemRandom::new()),
        )
    }

    /// Wire the app with explicit ports.
    pub fn with_ports(
        settings: ChatSettings,
        llm: Arc<dyn LlmPort>,
        world: WorldState,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        let chronicle = Arc::new(ChronicleStore::new());
        let world = Arc::new(WorldStore::new(world));
        let dice = Arc::new(DiceOps::new(random.clone()));

        let chat = Arc::new(ChatOps::new(
            llm,
            dice.clone(),
            chronicle.clone(),
            world.clone(),
            clock,
            random,
            settings,
        ));

        Self {
            use_cases: use_cases::UseCases { chat, dice },
            chronicle,
            world,
        }
    }
}
