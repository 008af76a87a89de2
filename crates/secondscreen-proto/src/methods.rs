//! Named constants for the method channel.
//!
//! Method names, notification names and error codes are shared between the
//! manager-side handler and every host that speaks the channel, so they live
//! here instead of being repeated as string literals.

// ---------------------------------------------------------------------------
// Inbound methods
// ---------------------------------------------------------------------------

/// Enumerate output surfaces, optionally filtered by category.
pub const METHOD_LIST_DISPLAY: &str = "listDisplay";

/// Create (or confirm) the execution context for a router name.
pub const METHOD_PREWARM_ENGINE: &str = "prewarmEngine";

/// Project a router name onto a display.
pub const METHOD_SHOW_PRESENTATION: &str = "showPresentation";

/// Dismiss by router name, display id, both, or neither (= all).
pub const METHOD_HIDE_PRESENTATION: &str = "hidePresentation";

/// Dismiss every live presentation and report the count.
pub const METHOD_HIDE_ALL_PRESENTATIONS: &str = "hideAllPresentations";

/// Router names with a live presentation.
pub const METHOD_GET_ACTIVE_PRESENTATIONS: &str = "getActivePresentations";

/// Forward an opaque payload into a secondary context.
pub const METHOD_TRANSFER_DATA: &str = "transferDataToPresentation";

/// Start streaming display connect/disconnect events.
pub const METHOD_SUBSCRIBE_DISPLAY_EVENTS: &str = "subscribeDisplayEvents";

/// Stop streaming display events.
pub const METHOD_UNSUBSCRIBE_DISPLAY_EVENTS: &str = "unsubscribeDisplayEvents";

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Sent once a secondary context has attached to its surface.
pub const NOTIFICATION_PRESENTATION_READY: &str = "presentationReady";

/// Event name used for display connect (`1`) / disconnect (`0`) frames.
pub const EVENT_DISPLAY_CHANGED: &str = "displayChanged";

/// Method invoked on a secondary context's own channel when data is routed to it.
pub const CHANNEL_METHOD_TRANSFER: &str = "transferDataToPresentation";

/// Router name used when a caller does not provide one.
pub const DEFAULT_ROUTER_NAME: &str = "presentation";

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

pub const ERR_INVALID_ARGUMENTS: &str = "INVALID_ARGUMENTS";
pub const ERR_DISPLAY_NOT_FOUND: &str = "DISPLAY_NOT_FOUND";
pub const ERR_ENGINE: &str = "FLUTTER_ENGINE_ERROR";
pub const ERR_SHOW_PRESENTATION: &str = "SHOW_PRESENTATION_ERROR";
pub const ERR_HIDE_PRESENTATION: &str = "HIDE_PRESENTATION_ERROR";
pub const ERR_PREWARM: &str = "PREWARM_ERROR";
pub const ERR_NOT_IMPLEMENTED: &str = "NOT_IMPLEMENTED";
pub const ERR_MALFORMED_CALL: &str = "MALFORMED_CALL";
