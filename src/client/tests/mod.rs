mod services;
mod sync_pull;
