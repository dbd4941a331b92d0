/// Shown in place of a thread root that has not been fetched yet.
pub const PENDING_ROOT_TEXT: &str = "[post not loaded yet]";
