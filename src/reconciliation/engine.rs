//! Reconciliation of one run's evidence against the persisted registry
//!
//! The engine is a pure function of (evidence, persisted registry): it groups the
//! fresh observations by account number, attaches each fresh group to the identity
//! it already had in the registry (or creates a new one), and hands back the
//! updated registry. Any group that would connect two distinct persisted
//! identities aborts the run with [`ResolveError::AmbiguousMatch`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

use crate::normalize::{is_be_equivalent, is_iban_be, is_noniban_be, unibanize_be};
use crate::reconciliation::Evidence;
use crate::registry::Registry;
use crate::types::*;

/// How a fresh group found its canonical representative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchRule {
    /// The fresh representative was already registered
    KnownIdentifier,
    /// Another member of the fresh group was already registered
    KnownMember,
    /// A registered key carries the same account number
    ExactNumber,
    /// A registered key carries the legacy form of the fresh IBAN; the IBAN takes over
    LegacyPromoted,
    /// A registered key carries the IBAN form of the fresh legacy number
    IbanKnown,
    /// Nothing matched: a newly observed account
    New,
}

/// Counters describing one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// Distinct identifiers observed this run
    pub observed: usize,
    /// Number groups built from this run's evidence
    pub fresh_groups: usize,
    /// Groups resolved through an already registered identifier
    pub known_matches: usize,
    /// Groups resolved by account number against registered keys
    pub number_matches: usize,
    /// Registered groups whose representative moved to a fresh IBAN
    pub promotions: usize,
    /// Groups that became new canonical accounts
    pub new_accounts: usize,
    /// Unnumbered identifiers registered as their own group
    pub leftovers: usize,
    /// Representatives in the updated registry
    pub representatives: usize,
}

impl ReconciliationReport {
    fn record(&mut self, rule: MatchRule) {
        match rule {
            MatchRule::KnownIdentifier | MatchRule::KnownMember => self.known_matches += 1,
            MatchRule::ExactNumber | MatchRule::IbanKnown => self.number_matches += 1,
            MatchRule::LegacyPromoted => {
                self.number_matches += 1;
                self.promotions += 1;
            }
            MatchRule::New => self.new_accounts += 1,
        }
    }
}

/// Outcome of a successful reconciliation
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub registry: Registry,
    pub report: ReconciliationReport,
}

/// Merges fresh evidence into a persisted registry
#[derive(Debug, Clone, Default)]
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Reconcile `evidence` with `persisted`, returning the updated registry.
    ///
    /// On error nothing is returned, so the caller's stored snapshot stays as it was.
    pub fn reconcile(&self, evidence: &Evidence, persisted: Registry) -> ResolveResult<Reconciliation> {
        let mut registry = persisted;
        let mut report = ReconciliationReport {
            observed: evidence.len(),
            ..Default::default()
        };

        let fresh = self.group_by_number(evidence)?;
        let fresh_reprs = fresh.representatives();
        report.fresh_groups = fresh_reprs.len();
        info!(
            observed = report.observed,
            fresh_groups = report.fresh_groups,
            registered = registry.len(),
            "reconciling evidence"
        );

        for fresh_repr in &fresh_reprs {
            let members = fresh
                .find_comp(fresh_repr)
                .ok_or_else(|| ResolveError::NotARepresentative(fresh_repr.clone()))?;
            let (repr, rule) = self.resolve_group(&mut registry, fresh_repr, members)?;
            debug!(fresh = %fresh_repr, canonical = %repr, ?rule, "resolved group");
            report.record(rule);
            self.absorb_group(&mut registry, &repr, fresh_repr, members)?;
        }

        for identifier in evidence.iter() {
            if identifier.number.is_none() && !registry.contains(identifier) {
                registry.add_repres(identifier.clone())?;
                report.leftovers += 1;
            }
        }

        report.representatives = registry.representatives().len();
        info!(
            representatives = report.representatives,
            new_accounts = report.new_accounts,
            promotions = report.promotions,
            "reconciliation complete"
        );
        Ok(Reconciliation { registry, report })
    }

    /// Group this run's numbered identifiers by account number.
    ///
    /// The first identifier seen with a number represents its group. A Belgian IBAN
    /// joins the group of its legacy form only when that legacy number was observed
    /// too; the IBAN side then represents the group, whichever came first. IBAN
    /// spellings with no observed legacy number stay apart.
    pub fn group_by_number(&self, evidence: &Evidence) -> ResolveResult<Registry> {
        let mut groups: Vec<(String, Vec<Identifier>)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for identifier in evidence.iter() {
            if let Some(number) = identifier.number() {
                match index.get(number) {
                    Some(&i) => groups[i].1.push(identifier.clone()),
                    None => {
                        index.insert(number.to_string(), groups.len());
                        groups.push((number.to_string(), vec![identifier.clone()]));
                    }
                }
            }
        }

        let mut fresh = Registry::new();
        // observed legacy number -> head of the IBAN group that owns it
        let mut iban_heads: HashMap<String, Identifier> = HashMap::new();

        for (number, members) in &groups {
            let head = &members[0];
            let observed_legacy = be_legacy_form(number).filter(|l| index.contains_key(l));
            let repr = if let Some(legacy) = observed_legacy {
                let owner = iban_heads
                    .get(&legacy)
                    .or_else(|| index.get(&legacy).map(|&i| &groups[i].1[0]))
                    .and_then(|k| fresh.find_repr(k))
                    .cloned();
                let repr = match owner {
                    Some(r) if is_iban_identifier(&r) => {
                        fresh.add_elem(head.clone(), &r)?;
                        r
                    }
                    Some(r) => {
                        fresh.update_repr(&r, head)?;
                        head.clone()
                    }
                    None => {
                        fresh.add_repres(head.clone())?;
                        head.clone()
                    }
                };
                iban_heads.entry(legacy).or_insert_with(|| repr.clone());
                repr
            } else if let Some(r) = iban_heads
                .get(number)
                .and_then(|k| fresh.find_repr(k))
                .cloned()
            {
                fresh.add_elem(head.clone(), &r)?;
                r
            } else {
                fresh.add_repres(head.clone())?;
                head.clone()
            };

            for duplicate in &members[1..] {
                fresh.add_elem(duplicate.clone(), &repr)?;
            }
        }

        Ok(fresh)
    }

    fn resolve_group(
        &self,
        registry: &mut Registry,
        fresh_repr: &Identifier,
        members: &BTreeSet<Identifier>,
    ) -> ResolveResult<(Identifier, MatchRule)> {
        let known: BTreeSet<Identifier> = members
            .iter()
            .filter_map(|m| registry.find_repr(m).cloned())
            .collect();
        if known.len() > 1 {
            return Err(ambiguous(fresh_repr, known));
        }
        if let Some(repr) = registry.find_repr(fresh_repr) {
            return Ok((repr.clone(), MatchRule::KnownIdentifier));
        }
        if let Some(repr) = known.into_iter().next() {
            return Ok((repr, MatchRule::KnownMember));
        }

        let Some(number) = fresh_repr.number() else {
            return Ok((fresh_repr.clone(), MatchRule::New));
        };

        let exact = registered_reprs(registry, |n| n == number);
        if let Some(repr) = single(fresh_repr, exact)? {
            return Ok((repr, MatchRule::ExactNumber));
        }

        if let Some(legacy) = be_legacy_form(number) {
            let legacy_owners = registered_reprs(registry, |n| n == legacy);
            if let Some(repr) = single(fresh_repr, legacy_owners)? {
                debug!(from = %repr, to = %fresh_repr, "promoting IBAN to representative");
                registry.update_repr(&repr, fresh_repr)?;
                return Ok((fresh_repr.clone(), MatchRule::LegacyPromoted));
            }
        }

        if is_noniban_be(number) {
            let iban_owners = registered_reprs(registry, |n| is_be_equivalent(n, number));
            if let Some(repr) = single(fresh_repr, iban_owners)? {
                return Ok((repr, MatchRule::IbanKnown));
            }
        }

        Ok((fresh_repr.clone(), MatchRule::New))
    }

    /// Register every member of the fresh group, and the fresh representative,
    /// under the canonical representative
    fn absorb_group(
        &self,
        registry: &mut Registry,
        repr: &Identifier,
        fresh_repr: &Identifier,
        members: &BTreeSet<Identifier>,
    ) -> ResolveResult<()> {
        if repr != fresh_repr {
            registry.add_elem(fresh_repr.clone(), repr)?;
        } else if !registry.contains(repr) {
            registry.add_repres(repr.clone())?;
        }

        let current = registry.find_comp(repr).cloned().unwrap_or_default();
        for member in members {
            if !current.contains(member) {
                registry.add_elem(member.clone(), repr)?;
            }
        }
        Ok(())
    }
}

/// Legacy form of a Belgian IBAN, `None` for anything else
fn be_legacy_form(number: &str) -> Option<String> {
    if is_iban_be(number) {
        unibanize_be(number)
    } else {
        None
    }
}

fn is_iban_identifier(identifier: &Identifier) -> bool {
    identifier.number().is_some_and(is_iban_be)
}

/// Distinct representatives of registered keys whose number satisfies `matches`
fn registered_reprs<F>(registry: &Registry, matches: F) -> BTreeSet<Identifier>
where
    F: Fn(&str) -> bool,
{
    registry
        .keys()
        .filter(|k| k.number().is_some_and(&matches))
        .filter_map(|k| registry.find_repr(k).cloned())
        .collect()
}

fn single(fresh_repr: &Identifier, candidates: BTreeSet<Identifier>) -> ResolveResult<Option<Identifier>> {
    if candidates.len() > 1 {
        return Err(ambiguous(fresh_repr, candidates));
    }
    Ok(candidates.into_iter().next())
}

fn ambiguous(fresh_repr: &Identifier, candidates: BTreeSet<Identifier>) -> ResolveError {
    let candidates: Vec<Identifier> = candidates.into_iter().collect();
    warn!(identifier = %fresh_repr, candidates = candidates.len(), "evidence matches several accounts");
    ResolveError::AmbiguousMatch {
        identifier: fresh_repr.clone(),
        candidates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IBAN: &str = "BE68539007547034";
    const IBAN_SPACED: &str = "BE68 5390 0754 7034";
    const LEGACY: &str = "539-0075470-34";

    fn evidence(ids: &[Identifier]) -> Evidence {
        Evidence::from_identifiers(ids.iter().cloned()).unwrap()
    }

    fn run(ids: &[Identifier], registry: Registry) -> ResolveResult<Reconciliation> {
        ReconciliationEngine::new().reconcile(&evidence(ids), registry)
    }

    #[test]
    fn test_group_by_number_shares_numbers() {
        let fresh = ReconciliationEngine::new()
            .group_by_number(&evidence(&[
                Identifier::named("001-2345678-90", "Alice"),
                Identifier::named("001-2345678-90", "A. Smith"),
                Identifier::name_only("Coffee Shop"),
            ]))
            .unwrap();
        assert_eq!(
            fresh.representatives(),
            vec![Identifier::named("001-2345678-90", "Alice")]
        );
        assert_eq!(fresh.len(), 2);
    }

    #[test]
    fn test_group_by_number_iban_wins_in_either_order() {
        let legacy = Identifier::named(LEGACY, "Alice");
        let iban = Identifier::number_only(IBAN);
        let engine = ReconciliationEngine::new();

        for ids in [vec![legacy.clone(), iban.clone()], vec![iban.clone(), legacy.clone()]] {
            let fresh = engine.group_by_number(&evidence(&ids)).unwrap();
            assert_eq!(fresh.representatives(), vec![iban.clone()]);
            assert_eq!(fresh.find_repr(&legacy), Some(&iban));
        }
    }

    #[test]
    fn test_group_by_number_joins_iban_spellings() {
        let a = Identifier::number_only(IBAN);
        let b = Identifier::number_only(IBAN_SPACED);
        let legacy = Identifier::number_only(LEGACY);
        let fresh = ReconciliationEngine::new()
            .group_by_number(&evidence(&[a.clone(), b.clone(), legacy.clone()]))
            .unwrap();
        assert_eq!(fresh.representatives().len(), 1);
        assert!(fresh.same_comp(&a, &b));
        assert!(fresh.same_comp(&a, &legacy));
    }

    #[test]
    fn test_group_by_number_keeps_unlinked_numbers_apart() {
        let spaced = Identifier::number_only(IBAN_SPACED);
        let compact = Identifier::number_only(IBAN);
        let other_check = Identifier::number_only("BE00539007547034");
        let unrelated = Identifier::named("001-2345678-90", "Bob");
        let fresh = ReconciliationEngine::new()
            .group_by_number(&evidence(&[
                spaced.clone(),
                compact.clone(),
                other_check.clone(),
                unrelated.clone(),
            ]))
            .unwrap();

        // no legacy number observed: nothing links the IBAN spellings
        assert_eq!(fresh.representatives().len(), 4);
        assert!(!fresh.same_comp(&spaced, &compact));
        assert!(!fresh.same_comp(&compact, &other_check));
        assert!(!fresh.same_comp(&compact, &unrelated));
    }

    #[test]
    fn test_iban_spellings_seen_in_separate_runs() {
        let spaced = Identifier::number_only(IBAN_SPACED);
        let compact = Identifier::number_only(IBAN);

        let first = run(&[compact.clone()], Registry::new()).unwrap().registry;
        let second = run(&[spaced.clone()], first).unwrap().registry;
        assert_eq!(second.representatives().len(), 2);

        let third = run(&[compact.clone(), spaced.clone()], second.clone()).unwrap();
        assert_eq!(third.registry, second);
        assert_eq!(third.report.known_matches, 2);
    }

    #[test]
    fn test_new_accounts_on_empty_registry() {
        let result = run(
            &[
                Identifier::named("001-2345678-90", "Alice"),
                Identifier::name_only("Coffee Shop"),
            ],
            Registry::new(),
        )
        .unwrap();
        assert_eq!(result.report.new_accounts, 1);
        assert_eq!(result.report.leftovers, 1);
        assert_eq!(result.registry.representatives().len(), 2);
    }

    #[test]
    fn test_known_member_adopts_registered_identity() {
        let registered = Identifier::named("001-2345678-90", "Alice");
        let registry = Registry::from_groups(vec![(registered.clone(), vec![])]).unwrap();

        // fresh representative is unknown but its group holds the registered key
        let fresh_head = Identifier::named("001-2345678-90", "A. Smith");
        let result = run(&[fresh_head.clone(), registered.clone()], registry).unwrap();

        assert_eq!(result.report.known_matches, 1);
        assert_eq!(result.registry.find_repr(&fresh_head), Some(&registered));
    }

    #[test]
    fn test_exact_number_match() {
        let registered = Identifier::named("001-2345678-90", "Alice");
        let registry = Registry::from_groups(vec![(registered.clone(), vec![])]).unwrap();
        let fresh = Identifier::named("001-2345678-90", "ALICE SMITH");

        let result = run(&[fresh.clone()], registry).unwrap();
        assert_eq!(result.report.number_matches, 1);
        assert_eq!(result.registry.find_repr(&fresh), Some(&registered));
    }

    #[test]
    fn test_fresh_iban_promotes_registered_legacy() {
        let legacy = Identifier::named(LEGACY, "Alice");
        let alias = Identifier::named(LEGACY, "A. Smith");
        let registry =
            Registry::from_groups(vec![(legacy.clone(), vec![alias.clone()])]).unwrap();
        let iban = Identifier::named(IBAN, "Alice");

        let result = run(&[iban.clone()], registry).unwrap();

        assert_eq!(result.report.promotions, 1);
        assert_eq!(result.registry.representatives(), vec![iban.clone()]);
        assert_eq!(result.registry.find_repr(&legacy), Some(&iban));
        assert_eq!(result.registry.find_repr(&alias), Some(&iban));
        assert_eq!(result.registry.find_comp(&iban).unwrap().len(), 3);
        result.registry.validate().unwrap();
    }

    #[test]
    fn test_fresh_legacy_adopts_registered_iban() {
        let iban = Identifier::named(IBAN, "Alice");
        let registry = Registry::from_groups(vec![(iban.clone(), vec![])]).unwrap();
        let legacy = Identifier::named(LEGACY, "Alice");

        let result = run(&[legacy.clone()], registry).unwrap();

        assert_eq!(result.report.promotions, 0);
        assert_eq!(result.registry.find_repr(&legacy), Some(&iban));
    }

    #[test]
    fn test_group_touching_two_identities_is_ambiguous() {
        let a = Identifier::named("001-2345678-90", "Alice");
        let b = Identifier::named("001-2345678-90", "Bob");
        let registry =
            Registry::from_groups(vec![(a.clone(), vec![]), (b.clone(), vec![])]).unwrap();

        let err = run(&[a.clone(), b.clone()], registry).unwrap_err();
        match err {
            ResolveError::AmbiguousMatch { candidates, .. } => {
                assert_eq!(candidates, vec![a, b]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_number_matching_two_identities_is_ambiguous() {
        let a = Identifier::named("001-2345678-90", "Alice");
        let b = Identifier::named("001-2345678-90", "Bob");
        let registry =
            Registry::from_groups(vec![(a, vec![]), (b, vec![])]).unwrap();

        let err = run(&[Identifier::number_only("001-2345678-90")], registry).unwrap_err();
        assert!(matches!(err, ResolveError::AmbiguousMatch { .. }));
    }

    #[test]
    fn test_iban_matching_two_legacy_identities_is_ambiguous() {
        let registry = Registry::from_groups(vec![
            (Identifier::named(LEGACY, "Alice"), Vec::new()),
            (Identifier::named(LEGACY, "Bob"), Vec::new()),
        ])
        .unwrap();

        let err = run(&[Identifier::number_only(IBAN)], registry).unwrap_err();
        match err {
            ResolveError::AmbiguousMatch { candidates, .. } => assert_eq!(candidates.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_legacy_matching_two_iban_identities_is_ambiguous() {
        let registry = Registry::from_groups(vec![
            (Identifier::number_only(IBAN), Vec::new()),
            (Identifier::number_only("BE00539007547034"), Vec::new()),
        ])
        .unwrap();

        let err = run(&[Identifier::number_only(LEGACY)], registry).unwrap_err();
        match err {
            ResolveError::AmbiguousMatch { candidates, .. } => assert_eq!(candidates.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let ids = [
            Identifier::named(LEGACY, "Alice"),
            Identifier::number_only(IBAN),
            Identifier::named("001-2345678-90", "Bob"),
            Identifier::name_only("Coffee Shop"),
        ];
        let first = run(&ids, Registry::new()).unwrap().registry;
        let second = run(&ids, first.clone()).unwrap();

        assert_eq!(second.registry, first);
        assert_eq!(second.registry.to_json().unwrap(), first.to_json().unwrap());
        assert_eq!(second.report.new_accounts, 0);
        assert_eq!(second.report.leftovers, 0);
    }
}
