use super::ReqScopedState;
use serde_json::{json, Value};

pub trait LoggerInterface {
    fn info(&self, item: &str);
    fn warning(&self, item: &str);
    fn danger(&self, item: &str);
    fn debug(&self, item: &str);
}

/// リクエストの情報を付けて tracing に流すロガー
#[derive(Clone, Debug)]
pub struct Logger<'a>(pub &'a ReqScopedState);

impl<'a> LoggerInterface for Logger<'a> {
    fn info(&self, item: &str) {
        log(self.0, LogLevel::Info, item)
    }

    fn warning(&self, item: &str) {
        log(self.0, LogLevel::Warning, item)
    }

    fn danger(&self, item: &str) {
        log(self.0, LogLevel::Danger, item)
    }

    fn debug(&self, item: &str) {
        log(self.0, LogLevel::Debug, item)
    }
}

#[derive(Clone, Copy, Debug)]
enum LogLevel {
    Info,
    Warning,
    Danger,
    Debug,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let item = match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Danger => "danger",
            LogLevel::Debug => "debug",
        };
        write!(f, "{}", item)
    }
}

fn entry(ctx: &ReqScopedState, level: LogLevel, item: &str) -> Value {
    let mut map = ctx.log_member.clone();

    map.insert("log_level".to_string(), json!(level.to_string()));
    map.insert("message".to_string(), json!(item));

    map.into()
}

fn log(ctx: &ReqScopedState, level: LogLevel, item: &str) {
    let entry = entry(ctx, level, item);
    match level {
        LogLevel::Info => tracing::info!(target: "fork_gateway::request", "{entry}"),
        LogLevel::Warning => tracing::warn!(target: "fork_gateway::request", "{entry}"),
        LogLevel::Danger => tracing::error!(target: "fork_gateway::request", "{entry}"),
        LogLevel::Debug => tracing::debug!(target: "fork_gateway::request", "{entry}"),
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use ulid::Ulid;

    use super::*;
    use crate::framework::system::{AuthenticatedUser, User};

    #[test]
    fn test_entry_carries_request_members() {
        let req = Request::builder()
            .method("GET")
            .uri("/fork")
            .header("user-agent", "test-agent")
            .header("cookie", "fork-gateway-session=secret")
            .body(Body::empty())
            .unwrap();
        let user = User::Authenticated(AuthenticatedUser {
            login: "alice".to_string(),
        });
        let ctx = ReqScopedState::new(Ulid::new(), &user, &req, None);

        let entry = entry(&ctx, LogLevel::Warning, "hello");

        assert_eq!(entry["message"], "hello");
        assert_eq!(entry["log_level"], "warning");
        assert_eq!(entry["uri"], "/fork");
        assert_eq!(entry["method"], "GET");
        assert_eq!(entry["user-agent"], "test-agent");
        assert_eq!(entry["user"], "alice");
        assert!(entry.get("cookie").is_none());
        assert_eq!(entry["req_id"], ctx.req_id.to_string());
    }
}
