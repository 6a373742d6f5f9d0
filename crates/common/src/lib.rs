/**
 * Typed requests against a coordinator's
 *  HTTP API, and the client that sends them.
 */
pub mod api;
/**
 * Encrypted image attachments.
 *  - XChaCha20-Poly1305 sealing
 *  - Content addressed blob store uploads
 *    authorized by short lived Nostr events
 *  - Integrity check before any decryption
 */
pub mod attachment;
/**
 * End-to-end encrypted trade chat
 *  over push or pull transports.
 */
pub mod chat;
/**
 * Cryptographic types and operations.
 *  - Garage keys and account derivation
 *  - Robot tokens
 *  - PGP and Nostr keys derived from a token
 *  - Symmetric file encryption
 */
pub mod crypto;
/**
 * Robot identities and the garage
 *  that owns them.
 */
pub mod identity;
/**
 * How the client reads an order's
 *  status: bonds, cancellation, renewal.
 */
pub mod order;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::attachment::{AttachmentError, AttachmentPipeline, FileMetadata};
    pub use crate::chat::{ChatError, ChatMessage, ChatState, EncryptedChat};
    pub use crate::crypto::{RootSecret, Token};
    pub use crate::identity::{Garage, RobotIdentity};
    pub use crate::order::{BondState, OrderStatus, RoleFlags};
    pub use crate::version::build_info;
}
