pub mod ids;
pub mod model;

pub use ids::{AudioEdition, Editions, RECITERS, Reciter, TextEdition};
pub use model::{AudioUrl, Passage, PlayableItem, StoryPosition, Verse};
