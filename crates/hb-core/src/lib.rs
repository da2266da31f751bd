//! hallboard/crates/hb-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Hallboard.

pub mod models;
pub mod traits;
pub mod error;

// Re-exporting for easier access in other crates
pub use models::*;
pub use traits::*;
pub use error::*;


#[cfg(test)]
mod tests {
    use super::models::*;
    use chrono::Utc;

    #[test]
    fn test_post_defaults_to_pending_outside_notice() {
        let post = Post::new(
            "general".to_string(),
            "1".to_string(),
            "Hello Rust!".to_string(),
            "World".to_string(),
            "u1".to_string(),
            None,
            "203.0.113.9".to_string(),
        );
        assert_eq!(post.moderation, ModerationState::Pending);
        assert_eq!(post.likes, 0);
        assert!(post.created_at <= Utc::now());
    }

    #[test]
    fn test_notice_posts_are_accepted_on_creation() {
        let post = Post::new(
            NOTICE_BOARD.to_string(),
            "announce-1".to_string(),
            "Maintenance".to_string(),
            "Dryer 3 is down".to_string(),
            "staff".to_string(),
            None,
            "203.0.113.9".to_string(),
        );
        assert_eq!(post.moderation, ModerationState::Accepted);
    }

    #[test]
    fn test_moderation_transitions() {
        use ModerationState::*;
        assert!(Pending.can_transition_to(Accepted));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Rejected.can_transition_to(Accepted));
        assert!(Accepted.can_transition_to(Rejected));
        assert!(!Accepted.can_transition_to(Pending));
        assert!(!Rejected.can_transition_to(Pending));
    }
}
