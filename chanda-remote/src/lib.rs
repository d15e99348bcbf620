//! Chanda Remote - REST Payment Store
//!
//! [`RestStore`] talks to a PostgREST endpoint (as exposed by Supabase)
//! holding the `payments` table. It implements
//! [`chanda_storage::PaymentStore`] and does nothing else: no caching, no
//! normalization, no retries.

mod rest;

pub use rest::RestStore;
