mod admin_user_repo;
mod record_repo;

pub use admin_user_repo::AdminUserRepo;
pub use record_repo::{Page, RecordRepo};
