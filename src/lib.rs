pub mod batch;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod ingest;
pub mod queue;
pub mod storage;
pub mod web;
