//! Default branch rewriting for reference advertisements.
//!
//! Clients pick the branch to check out from the first advertised reference.
//! When that reference is `HEAD` the client follows its `symref` capability and
//! matches the hash, so only those two are patched. Otherwise the first entry
//! itself is swapped for the target and the remaining references are re-sorted.

use crate::advertisement::{Advertisement, RefEntry, HEAD, SYMREF_PREFIX};
use crate::{GitError, Result};

/// The reference presented to clients as the repository default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultBranch {
    target: String,
}

impl DefaultBranch {
    /// Creates a rewriter for the fully qualified reference `target`.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    /// Returns the target reference name.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Rewrites `adv` so that the target is the advertised default.
    ///
    /// Fails with [`GitError::TargetNotFound`] when the upstream does not
    /// advertise the target.
    pub fn apply(&self, adv: Advertisement) -> Result<Advertisement> {
        let Advertisement {
            service,
            mut first,
            mut others,
        } = adv;

        if first.name == self.target {
            // Already promoted: only the ordering and symref need fixing.
            others.sort_by(|a, b| a.name.cmp(&b.name));
        } else {
            let pos = others
                .iter()
                .position(|entry| entry.name == self.target)
                .ok_or_else(|| GitError::TargetNotFound(self.target.clone()))?;

            if first.name == HEAD {
                first.hash = others[pos].hash.clone();
            } else {
                let promoted = others.remove(pos);
                let demoted = RefEntry::new(
                    std::mem::replace(&mut first.hash, promoted.hash),
                    std::mem::replace(&mut first.name, promoted.name),
                );
                others.push(demoted);
                others.sort_by(|a, b| a.name.cmp(&b.name));
            }
        }

        if let Some(caps) = first.capabilities.as_mut() {
            for cap in caps.iter_mut() {
                if let Some(value) = cap.strip_prefix(SYMREF_PREFIX) {
                    *cap = self.symref_capability(value);
                }
            }
        }

        tracing::debug!(
            target_ref = %self.target,
            first = %first.name,
            hash = %first.hash,
            refs = others.len(),
            "Rewrote default branch"
        );

        Ok(Advertisement {
            service,
            first,
            others,
        })
    }

    /// Points a `symref=` capability value at the target.
    ///
    /// `HEAD:refs/heads/main` keeps its source and becomes `HEAD:<target>`; a
    /// value without a source is replaced by the bare target.
    pub fn symref_capability(&self, value: &str) -> String {
        match value.split_once(':') {
            Some((source, _)) => format!("{}{}:{}", SYMREF_PREFIX, source, self.target),
            None => format!("{}{}", SYMREF_PREFIX, self.target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advertisement::UPLOAD_PACK_SERVICE;

    const A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const C: &str = "cccccccccccccccccccccccccccccccccccccccc";

    fn advertisement(first: RefEntry, others: &[(&str, &str)]) -> Advertisement {
        Advertisement {
            service: UPLOAD_PACK_SERVICE.to_string(),
            first,
            others: others
                .iter()
                .map(|(hash, name)| RefEntry::new(*hash, *name))
                .collect(),
        }
    }

    fn names(adv: &Advertisement) -> Vec<&str> {
        adv.others.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_head_first_patches_hash_and_symref() {
        let adv = advertisement(
            RefEntry::new(A, "HEAD").with_capabilities([
                "multi_ack",
                "symref=HEAD:refs/heads/main",
                "agent=git/2.43",
            ]),
            &[
                (A, "refs/heads/main"),
                (B, "refs/heads/dev"),
                (C, "refs/heads/go"),
            ],
        );

        let out = DefaultBranch::new("refs/heads/go").apply(adv).unwrap();
        assert_eq!(out.first.name, "HEAD");
        assert_eq!(out.first.hash, C);
        assert_eq!(
            out.first.capabilities,
            Some(vec![
                "multi_ack".to_string(),
                "symref=HEAD:refs/heads/go".to_string(),
                "agent=git/2.43".to_string(),
            ])
        );
        // Upstream order is kept untouched.
        assert_eq!(names(&out), ["refs/heads/main", "refs/heads/dev", "refs/heads/go"]);
    }

    #[test]
    fn test_non_head_first_promotes_target() {
        let adv = advertisement(
            RefEntry::new(A, "refs/heads/main").with_capabilities(["ofs-delta"]),
            &[(C, "refs/tags/v1"), (B, "refs/heads/go"), (C, "refs/heads/dev")],
        );

        let out = DefaultBranch::new("refs/heads/go").apply(adv).unwrap();
        assert_eq!(out.first.name, "refs/heads/go");
        assert_eq!(out.first.hash, B);
        assert_eq!(out.first.capabilities, Some(vec!["ofs-delta".to_string()]));
        assert_eq!(
            names(&out),
            ["refs/heads/dev", "refs/heads/main", "refs/tags/v1"]
        );
        let main = out.others.iter().find(|e| e.name == "refs/heads/main").unwrap();
        assert_eq!(main.hash, A);
    }

    #[test]
    fn test_missing_target() {
        let adv = advertisement(
            RefEntry::new(A, "HEAD").with_capabilities(["symref=HEAD:refs/heads/main"]),
            &[(A, "refs/heads/main")],
        );

        match DefaultBranch::new("refs/heads/go").apply(adv) {
            Err(GitError::TargetNotFound(name)) => assert_eq!(name, "refs/heads/go"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_head_as_target_and_empty_ref_set() {
        let adv = advertisement(RefEntry::new(A, "HEAD").with_capabilities(["x"]), &[]);
        assert!(DefaultBranch::new("HEAD").apply(adv).is_ok());

        let adv = advertisement(RefEntry::new(A, "HEAD").with_capabilities(["x"]), &[]);
        assert!(DefaultBranch::new("refs/heads/go").apply(adv).is_err());
    }

    #[test]
    fn test_already_promoted_is_idempotent() {
        let branch = DefaultBranch::new("refs/heads/go");
        let adv = advertisement(
            RefEntry::new(A, "refs/heads/main").with_capabilities(["symref=HEAD:refs/heads/main"]),
            &[(B, "refs/heads/go"), (C, "refs/heads/dev")],
        );

        let once = branch.apply(adv).unwrap();
        let twice = branch.apply(once.clone()).unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.first.symref(), Some("HEAD:refs/heads/go"));
    }

    #[test]
    fn test_symref_capability() {
        let branch = DefaultBranch::new("refs/heads/go");
        assert_eq!(
            branch.symref_capability("HEAD:refs/heads/main"),
            "symref=HEAD:refs/heads/go"
        );
        assert_eq!(branch.symref_capability("refs/heads/main"), "symref=refs/heads/go");
    }

    #[test]
    fn test_first_without_capabilities() {
        let adv = advertisement(RefEntry::new(A, "HEAD"), &[(B, "refs/heads/go")]);
        let out = DefaultBranch::new("refs/heads/go").apply(adv).unwrap();
        assert_eq!(out.first.hash, B);
        assert_eq!(out.first.capabilities, None);
    }
}
