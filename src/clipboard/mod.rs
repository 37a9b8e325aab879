//! Clipboard Content Handling
//!
//! Strategy-independent pieces of clipboard monitoring: classifying the
//! advertised MIME types, choosing which representation to read, and decoding
//! the payload into a [`ClipboardValue`].
//!
//! # Data Flow
//!
//! ```text
//! Strategy                     clipboard::                     Session
//! ━━━━━━━━                     ━━━━━━━━━━━                     ━━━━━━━
//!
//! selection changed
//!   └─> MIME list ────> mime::classify ─> ContentKind
//!                                             │
//!          ContentSource <── receiver::receive_value
//!                                             │
//!                                             └─> ClipboardValue ─> Delivery
//! ```

pub mod content;
pub mod error;
pub mod mime;
pub mod receiver;

pub use content::ClipboardValue;
pub use error::{
    classify_error, recovery_action, ErrorType, MonitorError, RecoveryAction, Result,
    MAX_STRATEGY_RETRIES, STRATEGY_RETRY_DELAY,
};
pub use mime::{classify, preferred_image_mime, ContentKind};
pub use receiver::{receive_value, ContentSource};
