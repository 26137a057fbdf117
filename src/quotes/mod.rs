//! Hero quote data generation from a local extractor dump.

pub mod conversation;
pub mod error;
pub mod generate;
pub mod record;
pub mod sidecar;
pub mod subtitles;

pub use conversation::{link_conversations, load_conversations, Conversation, ConversationLine};
pub use error::GenerateError;
pub use generate::{
    discover_voice_lines, generate, load_previous, merge_with_previous, write_output,
    GenerateOptions, GenerateReport, QuotesByHero, VoiceLineFile, VoiceSource,
};
pub use record::{HeroQuote, VoiceLineId, NPC_HERO_KEY};
