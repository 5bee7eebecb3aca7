//! Recursive macro expansion over the raw variable map.
//!
//! For every raw variable this computes the fully macro-substituted
//! value without recursing on the call stack. The algorithm keeps an
//! explicit stack of in-progress frames:
//! 1. Max depth is enforced from the stack length.
//! 2. Cyclical references are detected by walking the stack.
//! 3. No additional call frames are created, so input shape can never
//!    overflow the host stack.
//!
//! Depth and cycle conditions are warnings, not errors: the affected
//! root variable simply keeps its raw value. A root whose expansion
//! touched any secret variable becomes secret itself, and its final
//! value is handed to the secret registry before it is committed.

use std::collections::HashMap;
use std::fmt;

use jf_common::{MACRO_PREFIX, MACRO_SUFFIX};
use jf_mask::SecretSink;
use tracing::{trace, warn};

use crate::variable::{fold_name, Variable};

/// Maximum nesting depth for macro resolution.
pub const MAX_DEPTH: usize = 50;

/// Non-fatal condition recorded during a recompute pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpansionWarning {
    /// The variable's macro nesting reached [`MAX_DEPTH`]; it keeps
    /// its raw value.
    MaxDepthExceeded { name: String },
    /// The variable's macros refer back to a variable already being
    /// expanded; it keeps its raw value.
    CyclicReference { name: String },
}

impl ExpansionWarning {
    /// The root variable the warning is about.
    pub fn variable_name(&self) -> &str {
        match self {
            ExpansionWarning::MaxDepthExceeded { name } => name,
            ExpansionWarning::CyclicReference { name } => name,
        }
    }
}

impl fmt::Display for ExpansionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpansionWarning::MaxDepthExceeded { name } => write!(
                f,
                "variable '{name}' exceeds the maximum macro nesting depth of {MAX_DEPTH}"
            ),
            ExpansionWarning::CyclicReference { name } => {
                write!(f, "variable '{name}' contains a cyclical macro reference")
            }
        }
    }
}

/// One level of in-progress macro resolution.
struct Frame {
    /// Display name of the variable this frame is resolving.
    name: String,
    /// Folded name, for cycle checks.
    folded: String,
    /// Working string; child results are spliced into it.
    value: String,
    /// Byte offset to resume scanning from.
    start: usize,
    /// Byte offset of the pending macro's opening delimiter.
    prefix: usize,
    /// Byte offset of the pending macro's closing delimiter.
    suffix: usize,
}

impl Frame {
    fn new(name: &str, value: String) -> Self {
        Frame {
            name: name.to_string(),
            folded: fold_name(name),
            value,
            start: 0,
            prefix: 0,
            suffix: 0,
        }
    }

    /// Locate the next complete delimiter pair at or after `start`.
    ///
    /// On success, records the pair's offsets and returns the enclosed
    /// candidate span. Offsets are byte positions; the delimiters are
    /// ASCII, so every recorded offset is a char boundary.
    fn next_macro(&mut self) -> Option<(usize, usize)> {
        if self.start >= self.value.len() {
            return None;
        }
        let prefix = self.start + self.value[self.start..].find(MACRO_PREFIX)?;
        let name_start = prefix + MACRO_PREFIX.len();
        let suffix = name_start + self.value[name_start..].find(MACRO_SUFFIX)?;
        self.prefix = prefix;
        self.suffix = suffix;
        Some((name_start, suffix))
    }
}

/// Expand every variable in `raw`, producing the new expanded map and
/// the warnings collected along the way.
///
/// `raw` is keyed by folded name. Roots are processed independently;
/// nested values are read through `translate` at push time.
pub(crate) fn expand_map(
    raw: &HashMap<String, Variable>,
    translate: &dyn Fn(&str) -> String,
    sink: &dyn SecretSink,
) -> (HashMap<String, Variable>, Vec<ExpansionWarning>) {
    let mut expanded = raw.clone();
    let mut warnings = Vec::new();

    for (key, root) in raw {
        let mut secret = root.secret();
        if !secret {
            trace!(target: "jf_vars.expand", name = root.name(), "expanding variable");
        }

        let mut aborted = false;
        let mut stack: Vec<Frame> = Vec::new();
        let mut state = Frame::new(root.name(), root.value().to_string());

        // The outer loop manages popping completed frames; the inner
        // loop manages replacement within the active frame.
        loop {
            while let Some((name_start, name_end)) = state.next_macro() {
                let candidate = state.value[name_start..name_end].to_string();
                if !secret {
                    trace!(target: "jf_vars.expand", candidate, "found macro candidate");
                }

                let nested = if candidate.is_empty() {
                    None
                } else {
                    raw.get(&fold_name(&candidate))
                };
                match nested {
                    Some(nested) => {
                        // The active frame is not on the stack yet.
                        let current_depth = stack.len() + 1;
                        if current_depth == MAX_DEPTH {
                            warn!(
                                target: "jf_vars.expand",
                                name = root.name(),
                                "macro nesting exceeds max depth"
                            );
                            warnings.push(ExpansionWarning::MaxDepthExceeded {
                                name: root.name().to_string(),
                            });
                            aborted = true;
                            break;
                        }

                        let candidate_folded = fold_name(&candidate);
                        if candidate_folded == state.folded
                            || stack.iter().any(|f| f.folded == candidate_folded)
                        {
                            warn!(
                                target: "jf_vars.expand",
                                name = root.name(),
                                "cyclical macro reference detected"
                            );
                            warnings.push(ExpansionWarning::CyclicReference {
                                name: root.name().to_string(),
                            });
                            aborted = true;
                            break;
                        }

                        // Push the active frame and descend. The inner
                        // loop continues scanning the new frame.
                        secret = secret || nested.secret();
                        if !secret {
                            trace!(
                                target: "jf_vars.expand",
                                candidate,
                                "expanding nested variable"
                            );
                        }
                        let child = Frame::new(&candidate, translate(nested.value()));
                        stack.push(std::mem::replace(&mut state, child));
                    }
                    None => {
                        // Unknown macro stays verbatim; resume the scan
                        // just past the opening delimiter.
                        state.start = state.prefix + 1;
                    }
                }
            }

            // No partial commit when the root was aborted.
            if aborted {
                break;
            }

            let Some(mut parent) = stack.pop() else {
                // Root frame complete: commit only if expansion
                // changed anything.
                if state.value != root.value() {
                    if secret && !state.value.is_empty() {
                        sink.add_value(&state.value, &format!("store.recompute:{}", state.name));
                    }
                    if let Ok(variable) = Variable::new(
                        state.name.clone(),
                        state.value.clone(),
                        secret,
                        root.read_only(),
                        root.preserve_case(),
                    ) {
                        expanded.insert(key.clone(), variable);
                    }
                }
                break;
            };

            // Splice the completed child over the parent's macro span
            // and resume the parent just past the spliced text.
            parent.value = format!(
                "{}{}{}",
                &parent.value[..parent.prefix],
                state.value,
                &parent.value[parent.suffix + MACRO_SUFFIX.len()..]
            );
            parent.start = parent.prefix + state.value.len();
            state = parent;
            if !secret {
                trace!(
                    target: "jf_vars.expand",
                    name = state.name,
                    value = state.value,
                    "intermediate expansion state"
                );
            }
        }
    }

    (expanded, warnings)
}

/// Replace macros in `value` from `source`, one level deep.
///
/// Unlike [`expand_map`] this never recurses into substituted text:
/// the scan resumes past each replacement, so a value spliced in is
/// taken verbatim even if it contains macro tokens itself. Unknown
/// macros stay in place.
pub(crate) fn expand_once(source: &HashMap<String, String>, value: &str) -> String {
    let mut value = value.to_string();
    let mut start = 0;
    while start < value.len() {
        let Some(found) = value[start..].find(MACRO_PREFIX) else {
            break;
        };
        let prefix = start + found;
        let name_start = prefix + MACRO_PREFIX.len();
        let Some(found) = value[name_start..].find(MACRO_SUFFIX) else {
            break;
        };
        let suffix = name_start + found;
        let candidate = &value[name_start..suffix];
        let replacement = if candidate.is_empty() {
            None
        } else {
            source.get(&fold_name(candidate))
        };
        match replacement {
            Some(replacement) => {
                let advance = prefix + replacement.len();
                value = format!(
                    "{}{}{}",
                    &value[..prefix],
                    replacement,
                    &value[suffix + MACRO_SUFFIX.len()..]
                );
                start = advance;
            }
            None => start = prefix + 1,
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Sink that records registered values for assertions.
    struct RecordingSink {
        values: Mutex<Vec<(String, String)>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            RecordingSink {
                values: Mutex::new(Vec::new()),
            }
        }

        fn registered(&self) -> Vec<(String, String)> {
            self.values.lock().unwrap().clone()
        }
    }

    impl SecretSink for RecordingSink {
        fn add_value(&self, value: &str, origin: &str) {
            self.values
                .lock()
                .unwrap()
                .push((value.to_string(), origin.to_string()));
        }
    }

    fn raw_map(entries: &[(&str, &str)]) -> HashMap<String, Variable> {
        raw_map_with_secrets(entries, &[])
    }

    fn raw_map_with_secrets(
        entries: &[(&str, &str)],
        secrets: &[&str],
    ) -> HashMap<String, Variable> {
        entries
            .iter()
            .map(|(name, value)| {
                let secret = secrets.contains(name);
                let var = Variable::new(*name, *value, secret, false, false).unwrap();
                (var.folded_name(), var)
            })
            .collect()
    }

    fn identity(value: &str) -> String {
        value.to_string()
    }

    fn expand(raw: &HashMap<String, Variable>) -> (HashMap<String, Variable>, Vec<ExpansionWarning>) {
        expand_map(raw, &identity, &RecordingSink::new())
    }

    fn value_of<'a>(map: &'a HashMap<String, Variable>, name: &str) -> &'a str {
        map.get(&fold_name(name)).unwrap().value()
    }

    #[test]
    fn test_macro_free_values_unchanged() {
        let raw = raw_map(&[("a", "plain"), ("b", ""), ("c", "with spaces and $ signs")]);
        let (expanded, warnings) = expand(&raw);
        assert!(warnings.is_empty());
        assert_eq!(value_of(&expanded, "a"), "plain");
        assert_eq!(value_of(&expanded, "b"), "");
        assert_eq!(value_of(&expanded, "c"), "with spaces and $ signs");
    }

    #[test]
    fn test_simple_substitution() {
        let raw = raw_map(&[("a", "$(b)"), ("b", "hello")]);
        let (expanded, warnings) = expand(&raw);
        assert!(warnings.is_empty());
        assert_eq!(value_of(&expanded, "a"), "hello");
        assert_eq!(value_of(&expanded, "b"), "hello");
    }

    #[test]
    fn test_substitution_inside_text() {
        let raw = raw_map(&[("url", "https://$(host):$(port)/api"), ("host", "svc"), ("port", "8080")]);
        let (expanded, warnings) = expand(&raw);
        assert!(warnings.is_empty());
        assert_eq!(value_of(&expanded, "url"), "https://svc:8080/api");
    }

    #[test]
    fn test_nested_substitution() {
        let raw = raw_map(&[("a", "$(b)"), ("b", "x$(c)y"), ("c", "z")]);
        let (expanded, _) = expand(&raw);
        assert_eq!(value_of(&expanded, "a"), "xzy");
        assert_eq!(value_of(&expanded, "b"), "xzy");
    }

    #[test]
    fn test_case_insensitive_references() {
        let raw = raw_map(&[("a", "$(VALUE)"), ("Value", "42")]);
        let (expanded, warnings) = expand(&raw);
        assert!(warnings.is_empty());
        assert_eq!(value_of(&expanded, "a"), "42");
    }

    #[test]
    fn test_unknown_macro_stays_verbatim() {
        let raw = raw_map(&[("a", "before $(missing) after")]);
        let (expanded, warnings) = expand(&raw);
        assert!(warnings.is_empty());
        assert_eq!(value_of(&expanded, "a"), "before $(missing) after");
    }

    #[test]
    fn test_empty_macro_name_never_resolves() {
        let raw = raw_map(&[("a", "x$()y")]);
        let (expanded, warnings) = expand(&raw);
        assert!(warnings.is_empty());
        assert_eq!(value_of(&expanded, "a"), "x$()y");
    }

    #[test]
    fn test_unterminated_macro_left_alone() {
        let raw = raw_map(&[("a", "start $(b"), ("b", "value")]);
        let (expanded, warnings) = expand(&raw);
        assert!(warnings.is_empty());
        assert_eq!(value_of(&expanded, "a"), "start $(b");
    }

    #[test]
    fn test_unknown_then_known_macro() {
        // Cursor must advance past the unknown token and still find
        // the later, known one.
        let raw = raw_map(&[("a", "$(nope) $(b)"), ("b", "yes")]);
        let (expanded, _) = expand(&raw);
        assert_eq!(value_of(&expanded, "a"), "$(nope) yes");
    }

    #[test]
    fn test_substituted_text_is_not_rescanned() {
        // b's value contains a macro-shaped token; after splicing it
        // into a, the scan resumes past it.
        let raw = raw_map(&[("a", "$(b)"), ("b", "literal $(c)"), ("c", "cee")]);
        let (expanded, _) = expand(&raw);
        // b itself expands (it references c), and a picks up b's
        // expanded value through the frame push, so both end equal.
        assert_eq!(value_of(&expanded, "b"), "literal cee");
        assert_eq!(value_of(&expanded, "a"), "literal cee");
    }

    #[test]
    fn test_spliced_value_not_reexpanded_in_parent() {
        // c is unknown from b's perspective, so "$(c)" survives into
        // b's final value; when b is spliced into a, the parent cursor
        // skips the spliced region and must not resolve "$(c)" there
        // even though c exists for a.
        let raw = raw_map(&[("a", "$(b)$(c)"), ("b", "$(x)"), ("c", "cee")]);
        let (expanded, _) = expand(&raw);
        assert_eq!(value_of(&expanded, "b"), "$(x)");
        assert_eq!(value_of(&expanded, "a"), "$(x)cee");
    }

    #[test]
    fn test_direct_cycle() {
        let raw = raw_map(&[("a", "$(a)")]);
        let (expanded, warnings) = expand(&raw);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            ExpansionWarning::CyclicReference { name } if name == "a"
        ));
        assert_eq!(value_of(&expanded, "a"), "$(a)");
    }

    #[test]
    fn test_mutual_cycle_warns_for_both_roots() {
        let raw = raw_map(&[("a", "$(b)"), ("b", "$(a)")]);
        let (expanded, warnings) = expand(&raw);
        assert_eq!(warnings.len(), 2);
        let mut names: Vec<_> = warnings.iter().map(|w| w.variable_name()).collect();
        names.sort_unstable();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(value_of(&expanded, "a"), "$(b)");
        assert_eq!(value_of(&expanded, "b"), "$(a)");
    }

    #[test]
    fn test_cycle_detection_is_case_insensitive() {
        let raw = raw_map(&[("Outer", "$(INNER)"), ("inner", "$(outer)")]);
        let (_, warnings) = expand(&raw);
        assert_eq!(warnings.len(), 2);
        assert!(warnings
            .iter()
            .all(|w| matches!(w, ExpansionWarning::CyclicReference { .. })));
    }

    #[test]
    fn test_cycle_aborts_whole_root_without_partial_commit() {
        // The first macro resolves fine; the second one cycles. The
        // root must keep its full raw value, not the half-expanded one.
        let raw = raw_map(&[("a", "$(ok) $(loop)"), ("ok", "fine"), ("loop", "$(a)")]);
        let (expanded, warnings) = expand(&raw);
        assert!(warnings
            .iter()
            .any(|w| matches!(w, ExpansionWarning::CyclicReference { name } if name == "a")));
        assert_eq!(value_of(&expanded, "a"), "$(ok) $(loop)");
    }

    /// Build v0 -> v1 -> ... -> v{n-1}, where the last holds "end".
    fn chain(n: usize) -> HashMap<String, Variable> {
        let entries: Vec<(String, String)> = (0..n)
            .map(|i| {
                let value = if i + 1 == n {
                    "end".to_string()
                } else {
                    format!("$(v{})", i + 1)
                };
                (format!("v{}", i), value)
            })
            .collect();
        entries
            .iter()
            .map(|(name, value)| {
                let var = Variable::new(name.clone(), value.clone(), false, false, false).unwrap();
                (var.folded_name(), var)
            })
            .collect()
    }

    #[test]
    fn test_chain_at_max_depth_expands() {
        let raw = chain(MAX_DEPTH);
        let (expanded, warnings) = expand(&raw);
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
        assert_eq!(value_of(&expanded, "v0"), "end");
    }

    #[test]
    fn test_chain_past_max_depth_warns_and_keeps_raw() {
        let raw = chain(MAX_DEPTH + 1);
        let (expanded, warnings) = expand(&raw);
        assert!(warnings
            .iter()
            .any(|w| matches!(w, ExpansionWarning::MaxDepthExceeded { name } if name == "v0")));
        assert_eq!(value_of(&expanded, "v0"), "$(v1)");
        // Shallower roots along the chain still expand.
        assert_eq!(value_of(&expanded, "v1"), "end");
    }

    #[test]
    fn test_secret_taint_propagates_to_root() {
        let raw = raw_map_with_secrets(&[("a", "x$(s)y"), ("s", "hush-hush")], &["s"]);
        let sink = RecordingSink::new();
        let (expanded, warnings) = expand_map(&raw, &identity, &sink);
        assert!(warnings.is_empty());

        let a = expanded.get("a").unwrap();
        assert_eq!(a.value(), "xhush-hushy");
        assert!(a.secret(), "root touching a secret must become secret");

        let registered = sink.registered();
        assert!(registered
            .iter()
            .any(|(v, o)| v == "xhush-hushy" && o == "store.recompute:a"));
    }

    #[test]
    fn test_taint_survives_frame_pop() {
        // The secret frame completes and pops before the root
        // finishes; the taint must stick anyway.
        let raw = raw_map_with_secrets(
            &[("a", "$(s) then $(plain)"), ("s", "hidden-value"), ("plain", "ok")],
            &["s"],
        );
        let (expanded, _) = expand(&raw);
        assert!(expanded.get("a").unwrap().secret());
    }

    #[test]
    fn test_nonsecret_expansion_not_registered() {
        let raw = raw_map(&[("a", "$(b)"), ("b", "public")]);
        let sink = RecordingSink::new();
        let (_, _) = expand_map(&raw, &identity, &sink);
        assert!(sink.registered().is_empty());
    }

    #[test]
    fn test_unchanged_value_not_recommitted() {
        let raw = raw_map_with_secrets(&[("s", "itself")], &["s"]);
        let sink = RecordingSink::new();
        let (expanded, _) = expand_map(&raw, &identity, &sink);
        // Value did not change, so nothing is re-registered.
        assert!(sink.registered().is_empty());
        assert!(expanded.get("s").unwrap().secret());
    }

    #[test]
    fn test_read_only_not_inherited_from_nested() {
        let nested = Variable::new("ro", "locked", false, true, false).unwrap();
        let root = Variable::new("a", "$(ro)", false, false, false).unwrap();
        let raw: HashMap<_, _> = [(nested.folded_name(), nested), (root.folded_name(), root)]
            .into_iter()
            .collect();
        let (expanded, _) = expand(&raw);
        let a = expanded.get("a").unwrap();
        assert_eq!(a.value(), "locked");
        assert!(!a.read_only(), "read_only must come from the root only");
    }

    #[test]
    fn test_translator_applied_to_nested_values() {
        let raw = raw_map(&[("a", "$(path)"), ("path", "/host/dir")]);
        let translate = |value: &str| value.replace("/host", "/container");
        let (expanded, _) = expand_map(&raw, &translate, &RecordingSink::new());
        assert_eq!(value_of(&expanded, "a"), "/container/dir");
        // Roots themselves are not translated; only referenced values.
        assert_eq!(value_of(&expanded, "path"), "/host/dir");
    }

    #[test]
    fn test_multibyte_values_do_not_panic() {
        let raw = raw_map(&[("a", "héllo $(b) wörld"), ("b", "värde")]);
        let (expanded, warnings) = expand(&raw);
        assert!(warnings.is_empty());
        assert_eq!(value_of(&expanded, "a"), "héllo värde wörld");
    }

    #[test]
    fn test_repeated_reference_is_not_a_cycle() {
        let raw = raw_map(&[("a", "$(b) and $(b)"), ("b", "twice")]);
        let (expanded, warnings) = expand(&raw);
        assert!(warnings.is_empty());
        assert_eq!(value_of(&expanded, "a"), "twice and twice");
    }

    #[test]
    fn test_diamond_reference_is_not_a_cycle() {
        let raw = raw_map(&[
            ("top", "$(left)$(right)"),
            ("left", "$(base)"),
            ("right", "$(base)"),
            ("base", "x"),
        ]);
        let (expanded, warnings) = expand(&raw);
        assert!(warnings.is_empty());
        assert_eq!(value_of(&expanded, "top"), "xx");
    }

    // ── expand_once ─────────────────────────────────────────────────

    fn source(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (fold_name(k), v.to_string()))
            .collect()
    }

    #[test]
    fn test_expand_once_simple() {
        let src = source(&[("name", "world")]);
        assert_eq!(expand_once(&src, "hello $(name)"), "hello world");
    }

    #[test]
    fn test_expand_once_is_single_level() {
        let src = source(&[("a", "$(b)"), ("b", "deep")]);
        // The substituted "$(b)" is taken verbatim.
        assert_eq!(expand_once(&src, "got $(a)"), "got $(b)");
    }

    #[test]
    fn test_expand_once_unknown_macro_kept() {
        let src = source(&[("known", "k")]);
        assert_eq!(
            expand_once(&src, "$(unknown) $(known)"),
            "$(unknown) k"
        );
    }

    #[test]
    fn test_expand_once_case_insensitive() {
        let src = source(&[("Build.Number", "20260825.1")]);
        assert_eq!(expand_once(&src, "n=$(BUILD.NUMBER)"), "n=20260825.1");
    }

    #[test]
    fn test_expand_once_no_macros_identity() {
        let src = source(&[("a", "x")]);
        assert_eq!(expand_once(&src, "plain text"), "plain text");
    }

    // ── warnings ────────────────────────────────────────────────────

    #[test]
    fn test_warning_display_mentions_name() {
        let depth = ExpansionWarning::MaxDepthExceeded { name: "Root".into() };
        assert!(depth.to_string().contains("Root"));
        assert!(depth.to_string().contains("50"));

        let cycle = ExpansionWarning::CyclicReference { name: "Loopy".into() };
        assert!(cycle.to_string().contains("Loopy"));
    }
}
