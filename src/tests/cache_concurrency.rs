// Several clients sharing one cache directory: every read must see either
// nothing or one complete record, never a truncated one.

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::time::Duration;

    use tempfile::TempDir;

    use crate::cache::token_cache::TokenCache;
    use crate::observability::metrics::{Metrics, OP_LOOKUP};

    fn shared_cache(dir: &std::path::Path) -> TokenCache {
        TokenCache::new(
            dir.to_path_buf(),
            Duration::from_secs(1200),
            80,
            Duration::from_secs(5),
            Arc::new(Metrics::new().unwrap()),
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_and_readers_never_see_partial_records() {
        let tmp = TempDir::new().unwrap();
        let tokens: Vec<String> = (0..4).map(|i| format!("token-{}-{}", i, "x".repeat(4096 * (i + 1)))).collect();
        // file exists before the race so no reader can open a just-created empty file
        shared_cache(tmp.path()).store(&tokens[0]).await.unwrap();

        let mut writers = Vec::new();
        for token in tokens.clone() {
            let cache = shared_cache(tmp.path());
            writers.push(tokio::spawn(async move {
                for _ in 0..25 {
                    cache.store(&token).await.unwrap();
                }
            }));
        }

        let mut readers = Vec::new();
        for _ in 0..4 {
            let cache = shared_cache(tmp.path());
            let tokens = tokens.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..50 {
                    let token = cache.lookup().await.expect("record readable");
                    assert!(tokens.contains(&token.value), "torn read: {} bytes", token.value.len());
                    tokio::task::yield_now().await;
                }
                cache_lookup_failures(&cache)
            }));
        }

        for writer in writers {
            writer.await.unwrap();
        }
        for reader in readers {
            assert_eq!(reader.await.unwrap(), 0);
        }

        let last = shared_cache(tmp.path()).lookup().await.unwrap();
        assert!(tokens.contains(&last.value));
    }

    fn cache_lookup_failures(cache: &TokenCache) -> u64 {
        cache.metrics().cache_failures.with_label_values(&[OP_LOOKUP]).get()
    }
}
