//! Structured commit-message trailers shared by `BoardStore` (writer) and
//! `RulesDataAggregator` (reader).

/// `EisenKan-Priority: <label>` — the priority label in effect after the
/// commit. Lets a task's current priority be recovered from history once it
/// leaves a sectioned column, where the path itself carries no priority.
pub const PRIORITY_TRAILER: &str = "EisenKan-Priority";

/// `EisenKan-Move: <from>-><to>` — the column transition a commit performed,
/// if any. The aggregator's primary source for `column_enter_times`; a
/// legacy substring scan for `"to <column>"` is the documented fallback for
/// history written by an older implementation.
pub const MOVE_TRAILER: &str = "EisenKan-Move";

/// Parse a `EisenKan-Move` trailer value (`"<from>-><to>"`) into its parts.
pub fn parse_move_trailer(value: &str) -> Option<(&str, &str)> {
    value.split_once("->")
}

/// The legacy, fragile marker this design note decided to keep as a fallback:
/// a bare substring `"to <column>"` anywhere in the commit message.
pub fn legacy_enters_column(message: &str, column: &str) -> bool {
    message.contains(&format!("to {column}"))
}
