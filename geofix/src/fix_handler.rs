use crate::PositionFix;

/// Trait for components that consume position fixes
///
/// Lets the statistics, metrics and anything else downstream of a position
/// source receive the same fix without the delivery loop knowing about them.
pub trait FixHandler {
    /// Process an incoming position fix
    fn handle_fix(&mut self, fix: &PositionFix);
}
