//! Chat turn orchestration.
//!
//! A turn rolls any dice the player wrote, forwards the recent chronicle and
//! a fresh system prompt to the model, then post-processes the reply
//! according to the response mode.

use std::sync::Arc;

use tokio::sync::Mutex;

use faramita_domain::{
    attribute_bonus, ChronicleEntry, ChronicleRole, DiceCheck, DiceFormula, DiceRollResult,
};

use super::dice::{is_quick_roll_command, DiceOps, RollOutcome};
use super::narrative::{apply_active_role, apply_world_updates, parse_response, AiResponse};
use super::prompt::{format_history_entry, system_prompt_for};
use crate::infrastructure::config::ResponseMode;
use crate::infrastructure::ports::{ChatMessage, ClockPort, LlmPort, LlmRequest, RandomPort};
use crate::stores::{ChronicleStore, Exchange, WorldStore};

/// Per-session tuning taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatSettings {
    pub history_window: usize,
    pub response_mode: ResponseMode,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            history_window: crate::infrastructure::config::DEFAULT_HISTORY_WINDOW,
            response_mode: ResponseMode::default(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// What the player sees for one turn.
#[derive(Debug, Clone, Default)]
pub struct ChatReply {
    pub text: String,
    pub rolls: Vec<RollOutcome>,
    pub notifications: Vec<String>,
}

pub struct ChatOps {
    llm: Arc<dyn LlmPort>,
    dice: Arc<DiceOps>,
    chronicle: Arc<ChronicleStore>,
    world: Arc<WorldStore>,
    clock: Arc<dyn ClockPort>,
    random: Arc<dyn RandomPort>,
    settings: ChatSettings,
    // One turn at a time: a turn reads and writes both stores
    turn_lock: Mutex<()>,
}

impl ChatOps {
    pub fn new(
        llm: Arc<dyn LlmPort>,
        dice: Arc<DiceOps>,
        chronicle: Arc<ChronicleStore>,
        world: Arc<WorldStore>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            llm,
            dice,
            chronicle,
            world,
            clock,
            random,
            settings,
            turn_lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> ChatSettings {
        self.settings
    }

    /// Run one turn. Failures are reported in the reply text.
    pub async fn handle_message(&self, text: &str) -> ChatReply {
        let input = text.trim();
        if input.is_empty() {
            return ChatReply::default();
        }

        let _turn = self.turn_lock.lock().await;
        let mut parts = Vec::new();
        let mut rolls = Vec::new();
        let mut message = input.to_string();

        // 1. Quick roll: resolve the pending check, or just roll a d20
        if is_quick_roll_command(input) {
            match self.chronicle.pending_check().await {
                Some(check) => {
                    let roll = self.roll_check(&check).await;
                    let resolution = check.resolution(&roll);
                    self.chronicle.resolve_pending_check(&resolution).await;

                    let outcome = RollOutcome {
                        source: roll.formula.to_string(),
                        result: Ok(roll),
                    };
                    parts.push(format!("🎲 检定结果:\n{}\n{}", outcome.formatted(), resolution));
                    rolls.push(outcome);
                    tracing::info!(%resolution, "Resolved pending check");
                }
                None => {
                    let roll = self.dice.roll_d20();
                    let outcome = RollOutcome {
                        source: roll.formula.to_string(),
                        result: Ok(roll),
                    };
                    let reply = format!("🎲 D20 掷骰结果:\n{}", outcome.formatted());
                    self.chronicle.record_exchange(input, reply.as_str()).await;
                    return ChatReply {
                        text: reply,
                        rolls: vec![outcome],
                        notifications: Vec::new(),
                    };
                }
            }
        } else {
            // 2. Roll every formula the player embedded
            let player_rolls = self.dice.roll_all(input);
            if !player_rolls.is_empty() {
                let formatted = player_rolls
                    .iter()
                    .map(RollOutcome::formatted)
                    .collect::<Vec<_>>()
                    .join("\n");
                message = format!("{input}\n\n{formatted}");
                parts.push(format!("🎲 掷骰结果:\n{formatted}"));
                rolls.extend(player_rolls);
            }
        }

        // 3. Record the player's (augmented) message
        let turn = self.chronicle.next_turn().await;
        self.chronicle
            .append(turn, ChronicleRole::User, message, self.clock.now())
            .await;

        // 4. Ask the model
        let request = self.build_request().await;
        let mut notifications = Vec::new();
        match self.llm.generate(request).await {
            Ok(response) => match self.settings.response_mode {
                ResponseMode::Narrative => {
                    let (narrative, ai_rolls) = self.finish_narrative(turn, &response.content).await;
                    parts.push(narrative);
                    rolls.extend(ai_rolls);
                }
                ResponseMode::Structured => {
                    let (narrative, notes) = self.finish_structured(turn, &response.content).await;
                    parts.push(narrative);
                    notifications = notes;
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, turn, "Model request failed");
                parts.push(format!("错误: {e}"));
            }
        }

        let reply = parts
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        self.chronicle.record_exchange(input, reply.as_str()).await;

        ChatReply {
            text: reply,
            rolls,
            notifications,
        }
    }

    /// Drop history, transcript and pending check.
    pub async fn clear(&self) {
        let _turn = self.turn_lock.lock().await;
        self.chronicle.clear().await;
        tracing::info!("Chat history cleared");
    }

    /// Rewind the session to just before `turn`. World changes are kept.
    pub async fn rollback(&self, turn: u32) -> usize {
        let _turn = self.turn_lock.lock().await;
        let removed = self.chronicle.rollback(turn).await;
        tracing::info!(turn, removed, "Chat history rolled back");
        removed
    }

    pub async fn history(&self) -> Vec<ChronicleEntry> {
        self.chronicle.entries().await
    }

    pub async fn transcript(&self) -> Vec<Exchange> {
        self.chronicle.transcript().await
    }

    pub async fn pending_check(&self) -> Option<DiceCheck> {
        self.chronicle.pending_check().await
    }

    /// `1d20` plus the first active character's bonus for the check attribute.
    async fn roll_check(&self, check: &DiceCheck) -> DiceRollResult {
        let bonus = match check.attribute.as_deref() {
            Some(attribute) => {
                self.world
                    .read(|world| {
                        world
                            .active_characters()
                            .first()
                            .and_then(|c| c.attributes.get(attribute))
                            .map(attribute_bonus)
                    })
                    .await
            }
            None => None,
        }
        .unwrap_or(0);

        let formula = DiceFormula::new(1, 20, bonus).unwrap_or_else(|_| DiceFormula::d20());
        self.dice.roll_formula(&formula)
    }

    async fn build_request(&self) -> LlmRequest {
        let mode = self.settings.response_mode;
        let system_prompt = self.world.read(|world| system_prompt_for(world, mode)).await;
        let messages = self
            .chronicle
            .recent(self.settings.history_window)
            .await
            .iter()
            .map(|entry| {
                let content = format_history_entry(entry);
                match entry.role {
                    ChronicleRole::User => ChatMessage::user(content),
                    ChronicleRole::Assistant => ChatMessage::assistant(content),
                    ChronicleRole::System => ChatMessage::system(content),
                }
            })
            .collect();

        LlmRequest::new(messages)
            .with_system_prompt(system_prompt)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens)
    }

    /// Roll the model's own formulas and store the final text.
    async fn finish_narrative(&self, turn: u32, content: &str) -> (String, Vec<RollOutcome>) {
        let ai_rolls = self.dice.roll_all(content);
        let mut narrative = content.trim().to_string();
        for outcome in &ai_rolls {
            narrative.push_str("\n\n");
            narrative.push_str(&outcome.formatted());
        }

        self.chronicle
            .append(turn, ChronicleRole::Assistant, narrative.as_str(), self.clock.now())
            .await;
        (narrative, ai_rolls)
    }

    /// Apply a structured reply to the world and return its rendered text.
    async fn finish_structured(&self, turn: u32, content: &str) -> (String, Vec<String>) {
        let response = parse_response(content).unwrap_or_else(|| {
            tracing::debug!("Model reply was not structured, storing as environment");
            AiResponse::from_text(content)
        });

        let random = Arc::clone(&self.random);
        let notifications = self
            .world
            .write(|world| {
                let notes = apply_world_updates(world, &response.world_updates, random.as_ref());
                if let Some(role) = &response.active_role {
                    apply_active_role(world, role);
                }
                notes
            })
            .await;

        let now = self.clock.now();
        self.chronicle
            .append(turn, ChronicleRole::Assistant, response.to_json(), now)
            .await;
        for note in &notifications {
            self.chronicle
                .append(turn, ChronicleRole::System, format!("[System] {note}"), now)
                .await;
        }

        let mut text = response.render();
        for note in &notifications {
            text.push_str(&format!("\n\n[System] {note}"));
        }
        if let Some(check) = response.check() {
            let prompt = check_prompt(&check);
            self.chronicle.set_pending_check(turn, check, now).await;
            text.push_str("\n\n");
            text.push_str(&prompt);
        }
        (text, notifications)
    }
}

fn check_prompt(check: &DiceCheck) -> String {
    let description = check.description.as_deref().unwrap_or("检定");
    let dc = check
        .dc
        .map(|dc| format!(" (DC {dc})"))
        .unwrap_or_default();
    match check.attribute.as_deref() {
        Some(attribute) => format!(
            "🎲 需要检定: {description} [{attribute}]{dc}，输入「掷骰」进行投骰。"
        ),
        None => format!("🎲 需要检定: {description}{dc}，输入「掷骰」进行投骰。"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::{FixedClock, ScriptedRandom};
    use crate::infrastructure::ports::{
        FinishReason, LlmError, LlmResponse, MessageRole, MockLlmPort,
    };
    use chrono::{TimeZone, Utc};
    use faramita_domain::{WorldState, WorldTemplate};
    use std::sync::Mutex as StdMutex;

    /// Replays canned replies and keeps every request it was given.
    struct RecordingLlm {
        replies: StdMutex<Vec<Result<String, LlmError>>>,
        requests: StdMutex<Vec<LlmRequest>>,
    }

    impl RecordingLlm {
        fn new(replies: Vec<Result<&str, LlmError>>) -> Arc<Self> {
            let mut replies: Vec<_> = replies
                .into_iter()
                .map(|r| r.map(str::to_string))
                .collect();
            replies.reverse();
            Arc::new(Self {
                replies: StdMutex::new(replies),
                requests: StdMutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<LlmRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl LlmPort for RecordingLlm {
        async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
            self.requests.lock().unwrap().push(request);
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok("……".to_string()))?;
            Ok(LlmResponse {
                content: reply,
                finish_reason: FinishReason::Stop,
            })
        }
    }

    fn ops(llm: Arc<dyn LlmPort>, faces: &[i32], mode: ResponseMode) -> ChatOps {
        let random: Arc<dyn RandomPort> = Arc::new(ScriptedRandom::new(faces));
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()));
        ChatOps::new(
            llm,
            Arc::new(DiceOps::new(Arc::clone(&random))),
            Arc::new(ChronicleStore::new()),
            Arc::new(WorldStore::new(WorldState::from_template(WorldTemplate::oort()))),
            clock,
            random,
            ChatSettings {
                response_mode: mode,
                ..ChatSettings::default()
            },
        )
    }

    #[tokio::test]
    async fn empty_input_does_nothing() {
        let mut llm = MockLlmPort::new();
        llm.expect_generate().never();
        let chat = ops(Arc::new(llm), &[10], ResponseMode::Narrative);

        let reply = chat.handle_message("   ").await;
        assert!(reply.text.is_empty());
        assert!(chat.history().await.is_empty());
        assert!(chat.transcript().await.is_empty());
    }

    #[tokio::test]
    async fn quick_roll_without_check_skips_the_model() {
        let mut llm = MockLlmPort::new();
        llm.expect_generate().never();
        let chat = ops(Arc::new(llm), &[17], ResponseMode::Narrative);

        let reply = chat.handle_message("掷骰").await;
        assert_eq!(reply.text, "🎲 D20 掷骰结果:\n🎲 1d20\n结果: [17] = **17**");
        assert!(chat.history().await.is_empty());
        assert_eq!(chat.transcript().await.len(), 1);
    }

    #[tokio::test]
    async fn player_formulas_augment_the_message() {
        let llm = RecordingLlm::new(vec![Ok("剑锋划过夜空。")]);
        let chat = ops(llm.clone(), &[14], ResponseMode::Narrative);

        let reply = chat.handle_message("我挥剑 [[1d20+5]]").await;
        assert_eq!(
            reply.text,
            "🎲 掷骰结果:\n🎲 1d20+5\n结果: [14] + 5 = **19**\n\n剑锋划过夜空。"
        );
        assert_eq!(reply.rolls.len(), 1);

        let requests = llm.requests();
        let sent = &requests[0].messages[0];
        assert_eq!(sent.role, MessageRole::User);
        assert_eq!(sent.content, "我挥剑 [[1d20+5]]\n\n🎲 1d20+5\n结果: [14] + 5 = **19**");
        assert!(requests[0]
            .system_prompt
            .as_deref()
            .is_some_and(|p| p.contains("奥尔特大陆")));
    }

    #[tokio::test]
    async fn narrative_reply_rolls_model_formulas() {
        let llm = RecordingLlm::new(vec![Ok("陷阱触发 [[2d6]]")]);
        let chat = ops(llm, &[3], ResponseMode::Narrative);

        let reply = chat.handle_message("我推开门").await;
        assert_eq!(reply.text, "陷阱触发 [[2d6]]\n\n🎲 2d6\n结果: [3, 3] = **6**");

        let history = chat.history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, ChronicleRole::Assistant);
        assert_eq!(history[1].content, reply.text);
    }

    #[tokio::test]
    async fn model_error_becomes_reply_and_keeps_user_entry() {
        let mut llm = MockLlmPort::new();
        llm.expect_generate()
            .times(1)
            .returning(|_| Err(LlmError::NotConfigured));
        let chat = ops(Arc::new(llm), &[10], ResponseMode::Narrative);

        let reply = chat.handle_message("你好").await;
        assert!(reply.text.starts_with("错误: "));
        let history = chat.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, ChronicleRole::User);
    }

    #[tokio::test]
    async fn history_window_limits_sent_entries() {
        let llm = RecordingLlm::new(vec![]);
        let mut chat = ops(llm.clone(), &[10], ResponseMode::Narrative);
        chat.settings.history_window = 3;

        for n in 0..3 {
            chat.handle_message(&format!("第{n}句")).await;
        }
        let last = llm.requests().pop().unwrap();
        assert_eq!(last.messages.len(), 3);
        assert_eq!(last.messages[2].content, "第2句");
    }

    #[tokio::test]
    async fn structured_reply_updates_world_and_sets_check() {
        let reply = r#"{
            "sequence": [{"type": "dialogue", "speaker_name": "守卫", "content": "站住！"}],
            "interaction": {"needs_roll": true, "attribute": "str", "dc": 12, "description": "推开守卫"},
            "world_updates": [{"action": "CREATE", "type": "character", "data": {"id": "npc-guard", "name": "守卫"}}]
        }"#;
        let llm = RecordingLlm::new(vec![Ok(reply), Ok(r#"{"sequence": [{"type": "environment", "content": "守卫踉跄后退。"}]}"#)]);
        let chat = ops(llm.clone(), &[15], ResponseMode::Structured);

        let first = chat.handle_message("我走向城门").await;
        assert!(first.text.starts_with("守卫: 站住！"));
        assert!(first.text.contains("[System] Created new character: 守卫"));
        assert_eq!(first.notifications, vec!["Created new character: 守卫"]);
        assert!(chat.pending_check().await.is_some());

        let history = chat.history().await;
        assert_eq!(history[2].content, "[System] Created new character: 守卫");
        assert_eq!(history[3].content, "[SYSTEM] [DICE] 推开守卫 with str");

        // Hero has str 14, so 15 + 2
        let second = chat.handle_message("roll").await;
        assert!(second.text.starts_with("🎲 检定结果:"));
        assert!(second.text.contains("| Roll: 17 (DC 12) => SUCCESS"));
        assert!(second.text.ends_with("守卫踉跄后退。"));
        assert!(chat.pending_check().await.is_none());

        let history = chat.history().await;
        assert_eq!(
            history[3].content,
            "[SYSTEM] [DICE] 推开守卫 with str | Roll: 17 (DC 12) => SUCCESS"
        );
        assert_eq!(llm.requests().len(), 2);
    }

    #[tokio::test]
    async fn structured_mode_falls_back_to_raw_text() {
        let llm = RecordingLlm::new(vec![Ok("雾气弥漫。")]);
        let chat = ops(llm, &[10], ResponseMode::Structured);

        let reply = chat.handle_message("看看四周").await;
        assert_eq!(reply.text, "雾气弥漫。");
        let stored = &chat.history().await[1];
        assert!(stored.content.starts_with('{'));
        assert_eq!(format_history_entry(stored), "(Environment: 雾气弥漫。)");
    }

    #[tokio::test]
    async fn clear_resets_session() {
        let llm = RecordingLlm::new(vec![]);
        let chat = ops(llm, &[10], ResponseMode::Narrative);
        chat.handle_message("你好").await;

        chat.clear().await;
        assert!(chat.history().await.is_empty());
        assert!(chat.transcript().await.is_empty());
    }

    #[tokio::test]
    async fn rollback_rewinds_to_earlier_turn() {
        let reply = r#"{
            "sequence": [{"type": "environment", "content": "石门紧闭。"}],
            "interaction": {"needs_roll": true, "attribute": "str", "dc": 15, "description": "推门"}
        }"#;
        let llm = RecordingLlm::new(vec![Ok(r#"{"sequence": []}"#), Ok(reply), Ok(r#"{"sequence": []}"#)]);
        let chat = ops(llm.clone(), &[10], ResponseMode::Structured);

        chat.handle_message("进入地窖").await;
        chat.handle_message("推开石门").await;
        assert!(chat.pending_check().await.is_some());

        // user, assistant and the check announcement of turn 2
        assert_eq!(chat.rollback(2).await, 3);
        assert!(chat.pending_check().await.is_none());
        assert_eq!(chat.transcript().await.len(), 1);
        let history = chat.history().await;
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|entry| entry.turn == 1));

        chat.handle_message("换条路走").await;
        let history = chat.history().await;
        assert_eq!(history[2].turn, 2);
        assert_eq!(history[2].content, "换条路走");
        let last = llm.requests().pop().unwrap();
        assert_eq!(last.messages.len(), 3);
    }
}
