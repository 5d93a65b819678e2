pub mod chat_store;
pub mod deepseek;
pub mod supabase;

pub use chat_store::ChatStore;
pub use deepseek::DeepSeekService;
pub use supabase::SupabaseClient;
