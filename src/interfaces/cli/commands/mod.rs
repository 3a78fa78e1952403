mod config_gen;
mod status;
mod vapid_keys;

pub use config_gen::config_generate;
pub use status::reminder_status;
pub use vapid_keys::generate_vapid_key_pair;
