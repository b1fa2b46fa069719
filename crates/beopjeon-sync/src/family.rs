//! Statute family discovery.
//!
//! Given one statute, find the laws around it: the parent act of a decree or
//! rule, the enforcement decree and rule of an act, administrative rules
//! issued under it, and related special/framework acts. Discovery is a fixed
//! query plan ([`plan_queries`]) run against a [`LawSearch`] backend.

use std::collections::HashSet;
use std::fmt;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::law_api::{LawSearch, LawSummary};

const DECREE: &str = "시행령";
const RULE: &str = "시행규칙";
const ADMIN_SUFFIXES: [&str; 4] = ["고시", "훈령", "예규", "지침"];
const ADMIN_QUERY_TYPES: [&str; 5] = ["고시", "훈령", "예규", "지침", "규정"];
const RELATED_KEYWORDS: [&str; 3] = ["특별법", "기본법", "특례법"];
const MAX_ADMIN_RULES: usize = 10;

// ── Classification ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatuteKind {
    Act,
    EnforcementDecree,
    EnforcementRule,
    AdminRule,
}

/// Kind of statute implied by its name.
pub fn classify_name(name: &str) -> StatuteKind {
    if name.contains(RULE) {
        StatuteKind::EnforcementRule
    } else if name.contains(DECREE) {
        StatuteKind::EnforcementDecree
    } else if ADMIN_SUFFIXES.iter().any(|s| name.contains(s)) {
        StatuteKind::AdminRule
    } else {
        StatuteKind::Act
    }
}

/// The act name with decree/rule/admin suffixes removed.
pub fn base_name(name: &str) -> String {
    let mut base = name.to_string();
    for suffix in [DECREE, RULE].iter().chain(ADMIN_SUFFIXES.iter()) {
        base = base.replace(suffix, "");
    }
    base.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Query plan ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FamilyRole {
    Main,
    Upper,
    Lower,
    Admin,
    Related,
}

impl fmt::Display for FamilyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Main => "main",
            Self::Upper => "upper",
            Self::Lower => "lower",
            Self::Admin => "admin",
            Self::Related => "related",
        })
    }
}

/// Which results of a query are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accept {
    /// The first result that is the base act itself, or an act containing
    /// the base name that is not a decree or rule.
    ParentAct { base: String },
    /// Results among the first `take` whose name contains every needle.
    Containing { take: usize, needles: Vec<String> },
    /// The first result, unless it is the statute being explored.
    FirstOther { take: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyQuery {
    pub role: FamilyRole,
    pub query: String,
    pub accept: Accept,
}

impl FamilyQuery {
    fn new(role: FamilyRole, query: String, accept: Accept) -> Self {
        Self { role, query, accept }
    }

    /// Apply the acceptance rule to one page of search results.
    pub fn select<'a>(&self, results: &'a [LawSummary], main_id: &str) -> Vec<&'a LawSummary> {
        match &self.accept {
            Accept::ParentAct { base } => results
                .iter()
                .find(|r| {
                    r.law_name == *base
                        || (r.law_name.contains(base.as_str())
                            && r.law_name.contains('법')
                            && !r.law_name.contains(DECREE)
                            && !r.law_name.contains(RULE))
                })
                .into_iter()
                .collect(),
            Accept::Containing { take, needles } => results
                .iter()
                .take(*take)
                .filter(|r| needles.iter().all(|n| r.law_name.contains(n.as_str())))
                .collect(),
            Accept::FirstOther { take } => results
                .iter()
                .take(*take)
                .filter(|r| r.law_id != main_id)
                .collect(),
        }
    }
}

fn containing(take: usize, needles: &[&str]) -> Accept {
    Accept::Containing {
        take,
        needles: needles.iter().map(|s| s.to_string()).collect(),
    }
}

/// Queries needed to discover the family of `name`, in execution order.
pub fn plan_queries(name: &str) -> Vec<FamilyQuery> {
    let kind = classify_name(name);
    let base = base_name(name);
    let mut plan = Vec::new();

    if kind != StatuteKind::Act {
        plan.push(FamilyQuery::new(
            FamilyRole::Upper,
            base.clone(),
            Accept::ParentAct { base: base.clone() },
        ));
        if kind == StatuteKind::EnforcementRule {
            plan.push(FamilyQuery::new(
                FamilyRole::Upper,
                format!("{base} {DECREE}"),
                containing(1, &[DECREE]),
            ));
        }
    }

    if matches!(kind, StatuteKind::Act | StatuteKind::EnforcementDecree) {
        if kind == StatuteKind::Act {
            plan.push(FamilyQuery::new(
                FamilyRole::Lower,
                format!("{base} {DECREE}"),
                containing(2, &[DECREE, base.as_str()]),
            ));
        }
        plan.push(FamilyQuery::new(
            FamilyRole::Lower,
            format!("{base} {RULE}"),
            containing(2, &[RULE, base.as_str()]),
        ));
    }

    if kind != StatuteKind::AdminRule {
        for admin in ADMIN_QUERY_TYPES {
            for query in [format!("{base} {admin}"), format!("{base}{admin}")] {
                plan.push(FamilyQuery::new(FamilyRole::Admin, query, containing(3, &[admin, base.as_str()])));
            }
        }
    }

    for keyword in RELATED_KEYWORDS {
        if !base.contains(keyword) {
            plan.push(FamilyQuery::new(
                FamilyRole::Related,
                format!("{}{keyword}", base.replace('법', "")),
                Accept::FirstOther { take: 1 },
            ));
        }
    }

    plan
}

// ── Discovery ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyMember {
    pub role: FamilyRole,
    #[serde(flatten)]
    pub law: LawSummary,
}

/// Run the query plan for `main` and collect its family, `main` first.
///
/// Best-effort: a failed query is logged and contributes nothing. Members are
/// de-duplicated by `law_id` (first role wins) and at most ten admin rules are
/// kept. `concurrency` bounds in-flight searches; results are consumed in plan
/// order regardless.
pub async fn discover<S>(search: &S, main: &LawSummary, concurrency: usize) -> Vec<FamilyMember>
where
    S: LawSearch + ?Sized,
{
    let plan = plan_queries(&main.law_name);
    info!(law = %main.law_name, queries = plan.len(), "discovering statute family");

    let mut results = stream::iter(plan.into_iter().map(|q| async move {
        let outcome = search.search(&q.query).await;
        (q, outcome)
    }))
    .buffered(concurrency.max(1));

    let mut seen: HashSet<String> = HashSet::from([main.law_id.clone()]);
    let mut members = vec![FamilyMember {
        role: FamilyRole::Main,
        law: main.clone(),
    }];
    let mut admin_count = 0;

    while let Some((query, outcome)) = results.next().await {
        let found = match outcome {
            Ok(found) => found,
            Err(e) => {
                warn!(query = %query.query, error = %e, "family query failed");
                continue;
            }
        };
        for law in query.select(&found, &main.law_id) {
            if query.role == FamilyRole::Admin && admin_count >= MAX_ADMIN_RULES {
                break;
            }
            if !seen.insert(law.law_id.clone()) {
                continue;
            }
            if query.role == FamilyRole::Admin {
                admin_count += 1;
            }
            members.push(FamilyMember {
                role: query.role,
                law: law.clone(),
            });
        }
    }

    info!(law = %main.law_name, members = members.len(), "family discovery complete");
    members
}
