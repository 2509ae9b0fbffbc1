/// User-driven actions fed into the engine's control loop.
#[derive(Debug)]
pub enum EngineCommand {
    /// Start a call towards the room (broadcast offer).
    Call,

    /// Tear the current session down. A no-op when nothing is active.
    HangUp,

    /// Local capture became available; attach it to the current session
    /// (if any) and to every session created from now on.
    EnableLocalMedia,

    /// Send a chat line to the room.
    SendChat { name: String, message: String },
}
