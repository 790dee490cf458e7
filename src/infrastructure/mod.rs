// Infrastructure layer - External dependencies and adapters
pub mod broadcast;
pub mod config;
pub mod gateway_repository;
pub mod ndjson_stream;
