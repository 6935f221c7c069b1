//! Integration tests that need a real Postgres server. They run only when
//! `TEST_DATABASE_URL` points at one and pass trivially otherwise.
