//! フォーク元 (`git@host:owner/repo.git` または `https://host/owner/repo.git`)

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use url::Url;

use crate::framework::system::ConfigError;

const GIT_SUFFIX: &str = ".git";
const SSH_PREFIX: &str = "git@";
const HTTPS_PREFIX: &str = "https://";
const MAX_OWNER_LEN: usize = 39;

/// 英数字とハイフン区切り. 先頭・末尾・連続ハイフンは不可
static OWNER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+(-[A-Za-z0-9]+)*$").expect("valid owner pattern"));

/// `.` と `..` は API のパスが別物になるので別途弾く
static REPO_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid repo pattern"));

/// フォーク元リポジトリ
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Origin {
    owner: String,
    repo: String,
}

impl Origin {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for Origin {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let https = normalize(raw)?;
        let url = Url::parse(&https).map_err(|e| ConfigError::MalformedOrigin {
            origin: raw.trim().to_string(),
            reason: e.to_string(),
        })?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        let [owner, repo] = segments[..] else {
            return Err(ConfigError::MalformedOrigin {
                origin: raw.trim().to_string(),
                reason: "expected exactly <owner>/<repo>.git".to_string(),
            });
        };

        let repo = repo.strip_suffix(GIT_SUFFIX).unwrap_or(repo);
        if let Err(reason) = validate_repo(repo) {
            return Err(ConfigError::MalformedOrigin {
                origin: raw.trim().to_string(),
                reason: reason.to_string(),
            });
        }
        validate_owner(owner)?;

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }
}

/// SSH 形式を HTTPS 形式に揃える
fn normalize(raw: &str) -> Result<String, ConfigError> {
    let origin = raw.trim();
    if !origin.ends_with(GIT_SUFFIX) {
        return Err(ConfigError::MissingGitSuffix(origin.to_string()));
    }

    if let Some(rest) = origin.strip_prefix(SSH_PREFIX) {
        let Some((host, path)) = rest.split_once(':') else {
            return Err(ConfigError::MalformedOrigin {
                origin: origin.to_string(),
                reason: "missing ':' between host and path".to_string(),
            });
        };
        if host.is_empty() {
            return Err(ConfigError::MalformedOrigin {
                origin: origin.to_string(),
                reason: "host is empty".to_string(),
            });
        }
        return Ok(format!("{HTTPS_PREFIX}{host}/{}", path.trim_start_matches('/')));
    }

    if origin.starts_with(HTTPS_PREFIX) {
        return Ok(origin.to_string());
    }

    Err(ConfigError::UnsupportedScheme(origin.to_string()))
}

fn validate_owner(owner: &str) -> Result<(), ConfigError> {
    if owner.len() > MAX_OWNER_LEN || !OWNER_PATTERN.is_match(owner) {
        return Err(ConfigError::InvalidOwner(owner.to_string()));
    }
    Ok(())
}

fn validate_repo(repo: &str) -> Result<(), &'static str> {
    if repo.is_empty() {
        return Err("repository name is empty");
    }
    if repo == "." || repo == ".." || !REPO_PATTERN.is_match(repo) {
        return Err("invalid repository name");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<(String, String), ConfigError> {
        raw.parse::<Origin>()
            .map(|o| (o.owner().to_string(), o.repo().to_string()))
    }

    #[test]
    fn test_ssh_and_https_yield_same_pair() {
        let expected = ("octocat".to_string(), "Hello-World".to_string());

        assert_eq!(parse("git@github.com:octocat/Hello-World.git").unwrap(), expected);
        assert_eq!(parse("https://github.com/octocat/Hello-World.git").unwrap(), expected);
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let origin: Origin = "  git@github.com:octocat/Hello-World.git\n".parse().unwrap();
        assert_eq!(origin.to_string(), "octocat/Hello-World");
    }

    #[test]
    fn test_missing_git_suffix() {
        let err = parse("https://github.com/octocat/Hello-World").unwrap_err();
        assert!(matches!(err, ConfigError::MissingGitSuffix(_)));
    }

    #[test]
    fn test_leading_hyphen_owner() {
        let err = parse("git@github.com:-bad/repo.git").unwrap_err();
        assert_eq!(err, ConfigError::InvalidOwner("-bad".to_string()));
    }

    #[test]
    fn test_owner_rules() {
        assert!(parse("git@github.com:bad-/repo.git").is_err());
        assert!(parse("git@github.com:do--uble/repo.git").is_err());
        assert!(parse("git@github.com:under_score/repo.git").is_err());
        assert!(parse(&format!("git@github.com:{}/repo.git", "a".repeat(40))).is_err());

        assert!(parse(&format!("git@github.com:{}/repo.git", "a".repeat(39))).is_ok());
        assert!(parse("git@github.com:a-b-c/repo.git").is_ok());
        assert!(parse("https://github.com/-bad/repo.git").is_err());
    }

    #[test]
    fn test_unsupported_schemes() {
        for raw in [
            "http://github.com/octocat/Hello-World.git",
            "ssh://git@github.com/octocat/Hello-World.git",
            "github.com/octocat/Hello-World.git",
        ] {
            assert!(
                matches!(parse(raw), Err(ConfigError::UnsupportedScheme(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_malformed_paths() {
        assert!(matches!(
            parse("git@github.com:octocat.git"),
            Err(ConfigError::MalformedOrigin { .. })
        ));
        assert!(matches!(
            parse("https://github.com/octocat/Hello/World.git"),
            Err(ConfigError::MalformedOrigin { .. })
        ));
        assert!(matches!(
            parse("https://github.com/octocat/.git"),
            Err(ConfigError::MalformedOrigin { .. })
        ));
        assert!(matches!(
            parse("git@:octocat/Hello-World.git"),
            Err(ConfigError::MalformedOrigin { .. })
        ));
    }

    #[test]
    fn test_repo_names() {
        for raw in [
            "https://github.com/octocat/..git",
            "https://github.com/octocat/...git",
            "git@github.com:octocat/..git",
            "git@github.com:octocat/Hello%20World.git",
            "git@github.com:octocat/Hello World.git",
        ] {
            assert!(
                matches!(parse(raw), Err(ConfigError::MalformedOrigin { .. })),
                "{raw} should be rejected"
            );
        }

        assert_eq!(
            parse("git@github.com:octocat/my.repo_v2-rs.git").unwrap().1,
            "my.repo_v2-rs"
        );
        assert_eq!(parse("git@github.com:octocat/.github.git").unwrap().1, ".github");
    }

    #[test]
    fn test_ssh_path_with_leading_slash() {
        let origin: Origin = "git@github.com:/octocat/Hello-World.git".parse().unwrap();
        assert_eq!(origin.owner(), "octocat");
        assert_eq!(origin.repo(), "Hello-World");
    }
}
