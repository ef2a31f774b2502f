use redis::{aio::MultiplexedConnection, AsyncCommands, Client, Script};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::layout::SeatCategory;
use crate::services::inventory::Availability;

const AVAILABILITY_TTL_SECONDS: u64 = 30;
const FLOOR_TTL_SECONDS: u64 = 300;

// Entries are stored as "<show version>|<availability json>". An empty
// payload is a floor left by invalidation: a miss that still blocks writes
// computed from an older version.
const WRITE_IF_NOT_OLDER: &str = r#"
    local cur = redis.call('GET', KEYS[1])
    if cur then
        local v = tonumber(string.match(cur, '^(%-?%d+)|'))
        if v and v > tonumber(ARGV[1]) then
            return 0
        end
    end
    redis.call('SET', KEYS[1], ARGV[1] .. '|' .. ARGV[2], 'EX', ARGV[3])
    return 1
"#;

const RAISE_FLOOR: &str = r#"
    for _, key in ipairs(KEYS) do
        local cur = redis.call('GET', key)
        local v = cur and tonumber(string.match(cur, '^(%-?%d+)|'))
        if not v or v < tonumber(ARGV[1]) then
            redis.call('SET', key, ARGV[1] .. '|', 'EX', ARGV[2])
        end
    end
    return 1
"#;

/// Redis copy of availability responses. Advisory only: a miss or a Redis
/// failure falls back to the store, and admission never reads from here.
#[derive(Clone)]
pub struct CacheService {
    conn: MultiplexedConnection,
    ttl_seconds: u64,
}

fn availability_key(show_id: Uuid, category: SeatCategory) -> String {
    format!("availability:{show_id}:{category}")
}

/// Splits a stored entry into its version and, unless it is a floor, the
/// cached availability.
fn decode_entry(raw: &str) -> Option<(i64, Option<Availability>)> {
    let (version, payload) = raw.split_once('|')?;
    let version = version.parse().ok()?;
    if payload.is_empty() {
        return Some((version, None));
    }
    match serde_json::from_str(payload) {
        Ok(availability) => Some((version, Some(availability))),
        Err(e) => {
            warn!("Discarding unreadable availability cache entry: {}", e);
            None
        }
    }
}

impl CacheService {
    pub async fn connect(redis_url: &str) -> redis::RedisResult<Self> {
        let client = Client::open(redis_url)?;
        let conn = client.get_multiplexed_tokio_connection().await?;
        Ok(Self {
            conn,
            ttl_seconds: AVAILABILITY_TTL_SECONDS,
        })
    }

    pub async fn get_cached_availability(
        &self,
        show_id: Uuid,
        category: SeatCategory,
    ) -> Option<Availability> {
        let mut conn = self.conn.clone();
        let data: Option<String> = match conn.get(availability_key(show_id, category)).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Availability cache read failed: {}", e);
                return None;
            }
        };

        data.as_deref()
            .and_then(decode_entry)
            .and_then(|(_, availability)| availability)
    }

    /// Stores availability computed from `version` of the show, unless an
    /// invalidation for a newer version already happened.
    pub async fn cache_availability(
        &self,
        show_id: Uuid,
        category: SeatCategory,
        version: i64,
        availability: &Availability,
    ) {
        let data = match serde_json::to_string(availability) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to serialize availability: {}", e);
                return;
            }
        };

        let mut conn = self.conn.clone();
        let result: redis::RedisResult<i32> = Script::new(WRITE_IF_NOT_OLDER)
            .key(availability_key(show_id, category))
            .arg(version)
            .arg(data)
            .arg(self.ttl_seconds)
            .invoke_async(&mut conn)
            .await;
        match result {
            Ok(0) => debug!("Skipped stale availability for show {} at version {}", show_id, version),
            Ok(_) => {}
            Err(e) => warn!("Availability cache write failed: {}", e),
        }
    }

    /// Drops cached availability of both categories and refuses later writes
    /// computed from versions before `version`.
    pub async fn invalidate_availability(&self, show_id: Uuid, version: i64) {
        let script = Script::new(RAISE_FLOOR);
        let mut invocation = script.prepare_invoke();
        for category in SeatCategory::ALL {
            invocation.key(availability_key(show_id, category));
        }
        invocation.arg(version).arg(FLOOR_TTL_SECONDS);

        let mut conn = self.conn.clone();
        let result: redis::RedisResult<i32> = invocation.invoke_async(&mut conn).await;
        match result {
            Ok(_) => debug!("Invalidated availability cache for show {}", show_id),
            Err(e) => warn!("Failed to invalidate availability cache for show {}: {}", show_id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::SeatId;

    #[test]
    fn keys_are_scoped_by_show_and_category() {
        let id = Uuid::nil();
        assert_eq!(
            availability_key(id, SeatCategory::Vip),
            "availability:00000000-0000-0000-0000-000000000000:vip"
        );
        assert_ne!(
            availability_key(id, SeatCategory::Vip),
            availability_key(id, SeatCategory::Regular)
        );
    }

    #[test]
    fn entries_carry_their_show_version() {
        let availability = Availability {
            universe: vec![SeatId::from("A1"), SeatId::from("A2")],
            occupied: vec![SeatId::from("A2")],
        };
        let raw = format!("7|{}", serde_json::to_string(&availability).unwrap());

        assert_eq!(decode_entry(&raw), Some((7, Some(availability))));
    }

    #[test]
    fn floor_entries_are_misses() {
        assert_eq!(decode_entry("12|"), Some((12, None)));
    }

    #[test]
    fn malformed_entries_are_ignored() {
        assert_eq!(decode_entry("{\"universe\":[]}"), None);
        assert_eq!(decode_entry("x|{}"), None);
        assert_eq!(decode_entry("3|not json"), None);
    }
}
