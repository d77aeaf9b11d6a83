//! Request pacing driven by what the price endpoint tells us about its limits.
//!
//! Two kinds of signals are understood:
//! 1. `x-ratelimit-limit`, `x-ratelimit-remaining` and `x-ratelimit-reset`
//! headers. Remaining requests are spread evenly over the rest of the window.
//! 2. Status 429 "Too many requests" with `Retry-After` header in seconds.
//! Hermes answers bursts with 429 and a 60 second ban, next request is pushed
//! past it.
//!
//! Endpoints that return neither are not rate limited at all, the configured
//! request period is used as is.



use std::time::{
    Duration,
    SystemTime,
    UNIX_EPOCH,
};

use reqwest::{
    header::HeaderMap,
    StatusCode,
};



#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    limit: u64,
    remaining: u64,
    start: SystemTime,
    reset: SystemTime,
}



#[derive(Debug, Clone, Default)]
pub struct RateLimit {
    cur: Option<RateLimitInfo>,
    prev: Option<RateLimitInfo>,
}



fn header_u64(hm: &HeaderMap, name: &str) -> Option<u64> {
    hm.get(name)?
        .to_str().ok()?
        .trim()
        .parse().ok()
}



impl RateLimit {
    /// Start rate limiting current request.
    ///
    /// This method must be called on each request that must be rate limited.
    pub fn start(&mut self) {
        self.prev = self.cur.take();
    }


    /// Update internal state from HTTP response status and headers.
    ///
    /// When both 429 ban and x-ratelimit headers are present, the more
    /// restrictive values of the two are kept.
    pub fn update_from_headers(&mut self, start: &SystemTime, status: StatusCode,
        hm: &HeaderMap
    )
    {
        if status == StatusCode::TOO_MANY_REQUESTS {
            if let Some(secs) = header_u64(hm, "retry-after") {
                self.merge(RateLimitInfo {
                    limit: 0,
                    remaining: 0,
                    start: *start,
                    reset: *start + Duration::from_secs(secs),
                });
            }
        }

        let (Some(limit), Some(remaining), Some(reset)) = (
            header_u64(hm, "x-ratelimit-limit"),
            header_u64(hm, "x-ratelimit-remaining"),
            header_u64(hm, "x-ratelimit-reset"),
        ) else {
            return
        };

        self.merge(RateLimitInfo {
            limit, remaining,
            start: *start,
            reset: UNIX_EPOCH + Duration::from_secs(reset),
        });
    }



    // Overwrite current only with more-strict rate limiting.
    fn merge(&mut self, rl_info: RateLimitInfo) {
        let Some(cur) = &mut self.cur else {
            self.cur = Some(rl_info);
            return
        };

        if cur.reset < rl_info.reset {
            cur.reset = rl_info.reset;
        }

        if cur.remaining > rl_info.remaining {
            cur.remaining = rl_info.remaining;
        }

        if cur.limit > rl_info.limit {
            cur.limit = rl_info.limit;
        }
    }



    /// Adjust time for next request based on rate limit.
    pub fn ts_next_req_adjust(&self, ts_next_req: &mut SystemTime) {
        // Endpoint did not tell us anything, configured period is all we have.
        let Some(ref cur) = self.cur else {
            return
        };

        // If request is scheduled after rate limiting window reset, it will not
        // exceed rate limit imposed by API endpoint.
        // This works correctly only if system clocks are synchronized well
        // enough.
        if *ts_next_req >= cur.reset {
            return
        }

        // If rate-limit reached, wait till next window.
        if cur.remaining < 1 {
            if cur.reset > *ts_next_req {
                log::warn!("price endpoint rate limit reached, waiting for reset");
                *ts_next_req = cur.reset;
            }

            return
        }

        // First request, and we are allowed to make more. We trust that
        // configuration is good enough for service to work properly.
        let Some(ref prev) = self.prev else {
            return
        };

        // Measure interval between our requests. Use this instead of absolute
        // clock value to minimize impact on un-synced clocks between our system
        // and API endpoint.
        let Ok(request_interval) = cur.start.duration_since(prev.start) else {
            log::warn!(concat!("clock may have gone backwards,",
                " rate limiting policy might not be honored properly"
            ));

            return
        };

        let Ok(win_duration) = cur.reset.duration_since(cur.start) else {
            // Endpoint should never return reset that is before request start
            // unless clocks are out of sync. Fall back to configured period.
            log::warn!(concat!("host and endpoint clocks are out of sync,",
                " rate limiting policy might not be honored properly"
            ));

            return
        };

        let d = win_duration.as_millis();
        let allowed_duration_ms = d / cur.remaining as u128;
        let rl_duration = Duration::from_millis(allowed_duration_ms as u64);

        // If we already make requests less often than the limit requires,
        // there is nothing to adjust.
        if request_interval > rl_duration {
            return
        }

        let ts = cur.start + rl_duration;
        if ts > *ts_next_req {
            *ts_next_req = ts;
        }
    }
}
