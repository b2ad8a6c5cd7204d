mod common;

mod cache_concurrency;
