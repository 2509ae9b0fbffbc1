mod harness;

pub use harness::*;
pub use mock_media::*;
