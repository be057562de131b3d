use basebot_core::{ActivityKind, PresenceSetter};
use serenity::all::{ActivityData, Context};

/// Status shown when none is configured
pub const DEFAULT_STATUS: &str = "with Slash Commands";

pub fn activity(kind: ActivityKind, text: &str) -> ActivityData {
    match kind {
        ActivityKind::Playing => ActivityData::playing(text),
        ActivityKind::Watching => ActivityData::watching(text),
        ActivityKind::Listening => ActivityData::listening(text),
    }
}

/// Sets the activity through the shard that delivered the event
pub struct ShardPresence {
    ctx: Context,
}

impl ShardPresence {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }
}

impl PresenceSetter for ShardPresence {
    fn set_activity(&self, kind: ActivityKind, text: &str) {
        self.ctx.set_activity(Some(activity(kind, text)));
    }
}
