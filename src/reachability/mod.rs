//! Which sibling branches can never be taken.
//!
//! Under first-match evaluation the dialogue engine walks a pointer list in
//! order and takes the first pointer whose guard passes, so an unconditional
//! pointer shadows every sibling after it. Under independent evaluation each
//! guard stands alone and only provably-false guards are unreachable.

pub mod classify;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::graph::model::{DialogGraph, GraphError, ListId, NodeKind};

pub use classify::{GuardClass, GuardClassifier, StaticClassifier};

/// How the engine evaluates one sibling list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiblingRule {
    FirstMatch,
    Independent,
}

/// Configured evaluation order, possibly depending on which side speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvaluationOrder {
    /// Every list is first-match.
    #[default]
    FirstMatch,
    /// Every list is evaluated per sibling.
    Independent,
    /// NPC entry lists are first-match; player reply lists show every
    /// reply whose guard passes.
    EntriesFirstMatch,
}

impl EvaluationOrder {
    pub const ALL: [EvaluationOrder; 3] = [
        EvaluationOrder::FirstMatch,
        EvaluationOrder::Independent,
        EvaluationOrder::EntriesFirstMatch,
    ];

    /// The rule for a list whose children are of `child_kind`.
    pub fn rule_for(self, child_kind: NodeKind) -> SiblingRule {
        match (self, child_kind) {
            (Self::FirstMatch, _) => SiblingRule::FirstMatch,
            (Self::Independent, _) => SiblingRule::Independent,
            (Self::EntriesFirstMatch, NodeKind::Entry) => SiblingRule::FirstMatch,
            (Self::EntriesFirstMatch, NodeKind::Reply) => SiblingRule::Independent,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstMatch => "first-match",
            Self::Independent => "independent",
            Self::EntriesFirstMatch => "entries-first-match",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::FirstMatch => Self::Independent,
            Self::Independent => Self::EntriesFirstMatch,
            Self::EntriesFirstMatch => Self::FirstMatch,
        }
    }
}

impl fmt::Display for EvaluationOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvaluationOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|o| o.as_str() == s.trim())
            .ok_or_else(|| {
                format!(
                    "unknown evaluation order {:?} (expected first-match, independent or entries-first-match)",
                    s
                )
            })
    }
}

/// Indices (0-based, in sibling order) of statically unreachable pointers.
///
/// `None` in `guards` means the pointer has no guard script.
pub fn unreachable_indices<C>(
    guards: &[Option<&str>],
    classifier: &C,
    rule: SiblingRule,
) -> BTreeSet<usize>
where
    C: GuardClassifier + ?Sized,
{
    let mut unreachable = BTreeSet::new();
    let mut shadowed = false;
    for (idx, guard) in guards.iter().enumerate() {
        if shadowed {
            unreachable.insert(idx);
            continue;
        }
        let class = match guard {
            None => GuardClass::AlwaysTrue,
            Some(script) => classifier.classify(script),
        };
        match class {
            GuardClass::AlwaysFalse => {
                unreachable.insert(idx);
            }
            GuardClass::AlwaysTrue if rule == SiblingRule::FirstMatch => shadowed = true,
            _ => {}
        }
    }
    unreachable
}

/// Unreachable siblings of one pointer list in `graph`.
pub fn unreachable_in_list<C>(
    graph: &DialogGraph,
    list: ListId,
    classifier: &C,
    order: EvaluationOrder,
) -> Result<BTreeSet<usize>, GraphError>
where
    C: GuardClassifier + ?Sized,
{
    let pointers = graph
        .children(list)
        .ok_or(GraphError::InvalidParentReference(list))?;
    let child_kind = graph
        .child_kind(list)
        .ok_or(GraphError::InvalidParentReference(list))?;
    let guards: Vec<Option<&str>> = pointers
        .iter()
        .map(|p| graph.pointer(*p).and_then(|p| p.condition()))
        .collect();
    Ok(unreachable_indices(
        &guards,
        classifier,
        order.rule_for(child_kind),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn indeterminate(_: &str) -> GuardClass {
        GuardClass::Indeterminate
    }

    fn set(items: &[usize]) -> BTreeSet<usize> {
        items.iter().copied().collect()
    }

    #[test]
    fn unconditional_pointer_shadows_later_siblings() {
        let classifier = StaticClassifier::new();
        let guards = [Some("IsQuestComplete()"), Some(""), Some("1==2")];
        assert_eq!(
            unreachable_indices(&guards, &classifier, SiblingRule::FirstMatch),
            set(&[2])
        );
    }

    #[test]
    fn always_false_does_not_block_successors() {
        let classifier = StaticClassifier::new();
        let guards = [Some("0"), Some("gc_check"), None, Some("gc_late")];
        assert_eq!(
            unreachable_indices(&guards, &classifier, SiblingRule::FirstMatch),
            set(&[0, 3])
        );
    }

    #[test]
    fn independent_only_hides_false_guards() {
        let classifier = StaticClassifier::new();
        let guards = [None, Some("FALSE"), None, Some("gc_x")];
        assert_eq!(
            unreachable_indices(&guards, &classifier, SiblingRule::Independent),
            set(&[1])
        );
    }

    #[test]
    fn empty_list_has_nothing_unreachable() {
        assert!(unreachable_indices(&[], &indeterminate, SiblingRule::FirstMatch).is_empty());
    }

    #[test]
    fn entries_first_match_depends_on_child_kind() {
        let order = EvaluationOrder::EntriesFirstMatch;
        assert_eq!(order.rule_for(NodeKind::Entry), SiblingRule::FirstMatch);
        assert_eq!(order.rule_for(NodeKind::Reply), SiblingRule::Independent);
    }

    #[test]
    fn unreachable_in_list_reads_graph_conditions() {
        let mut g = DialogGraph::new();
        let a = g.add_child(ListId::Root, None).unwrap();
        let _b = g.add_child(ListId::Root, None).unwrap();
        let c = g.add_child(ListId::Root, None).unwrap();
        g.set_condition(a, Some("gc_first_visit".into())).unwrap();
        g.set_condition(c, Some("gc_late".into())).unwrap();

        let got = unreachable_in_list(
            &g,
            ListId::Root,
            &StaticClassifier::new(),
            EvaluationOrder::FirstMatch,
        )
        .unwrap();
        assert_eq!(got, set(&[2]));
    }

    #[test]
    fn unreachable_in_list_rejects_missing_list() {
        let g = DialogGraph::new();
        let list = ListId::Node(crate::graph::model::NodeId::from_raw(3));
        assert_eq!(
            unreachable_in_list(&g, list, &indeterminate, EvaluationOrder::FirstMatch),
            Err(GraphError::InvalidParentReference(list))
        );
    }

    #[test]
    fn evaluation_order_round_trips_through_text() {
        for order in EvaluationOrder::ALL {
            assert_eq!(order.as_str().parse::<EvaluationOrder>(), Ok(order));
        }
        assert!("whatever".parse::<EvaluationOrder>().is_err());
    }

    fn guard_strategy() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            Just(Some(String::new())),
            Just(Some("0".to_string())),
            Just(Some("1==2".to_string())),
            "[a-z_]{1,8}\\(\\)".prop_map(Some),
        ]
    }

    proptest! {
        #[test]
        fn no_guard_shadows_everything_after(
            guards in prop::collection::vec(guard_strategy(), 0..12),
            pos in 0usize..12,
        ) {
            let mut guards = guards;
            if guards.is_empty() {
                return Ok(());
            }
            let pos = pos % guards.len();
            guards[pos] = None;
            for g in guards.iter_mut().take(pos) {
                // Earlier siblings must not shadow `pos` for this property.
                if g.as_deref().is_none_or(|s| s.is_empty()) {
                    *g = Some("gc_maybe()".to_string());
                }
            }
            let views: Vec<Option<&str>> = guards.iter().map(|g| g.as_deref()).collect();
            let got = unreachable_indices(&views, &StaticClassifier::new(), SiblingRule::FirstMatch);
            for idx in pos + 1..guards.len() {
                prop_assert!(got.contains(&idx));
            }
            prop_assert!(!got.contains(&pos));
            for idx in 0..pos {
                let provably_false = StaticClassifier::new()
                    .classify(views[idx].unwrap_or_default()) == GuardClass::AlwaysFalse;
                prop_assert_eq!(got.contains(&idx), provably_false);
            }
        }

        #[test]
        fn all_indeterminate_is_empty(len in 0usize..20) {
            let guards: Vec<Option<&str>> = vec![Some("gc_check()"); len];
            prop_assert!(unreachable_indices(&guards, &indeterminate, SiblingRule::FirstMatch).is_empty());
            prop_assert!(unreachable_indices(&guards, &indeterminate, SiblingRule::Independent).is_empty());
        }
    }
}
