//! The PAC script template.

use crate::error::{PacError, Result};

/// Replaced by the compiled domain clauses.
pub const RULES_MARKER: &str = "/*{PROXY-RULES}*/";

/// Replaced by the compiled proxy string.
pub const DEFINES_MARKER: &str = "/*{PROXY-DEFINES}*/";

/// `+Auto` tries every domain clause and otherwise returns `DIRECT`.
/// `+PACHost` keeps loopback direct and returns the proxy string.
/// Markers sit in comments so the unrendered text is still valid script.
const BUILTIN_TEMPLATE: &str = r#"
var FindProxyForURL = function (init, profiles) {
    return function (url, host) {
        "use strict";
        var result = init, scheme = url.substr(0, url.indexOf(":"));
        do {
            result = profiles[result];
            if (typeof result === "function") result = result(url, host, scheme);
        } while (typeof result !== "string" || result.charCodeAt(0) === 43);
        return result;
    };
}("+Auto", {
    "+Auto": function (url, host, scheme) {
        "use strict";
        /*{PROXY-RULES}*/
        return "DIRECT";
    },
    "+PACHost": function (url, host, scheme) {
        "use strict";
        if (/^127\.0\.0\.1$/.test(host) || /^::1$/.test(host) || /^localhost$/.test(host)) return "DIRECT";
        return "/*{PROXY-DEFINES}*/";
    }
});
"#;

/// A validated PAC template.
#[derive(Debug, Clone)]
pub struct PacTemplate {
    text: &'static str,
}

impl PacTemplate {
    /// Validates that each marker occurs exactly once.
    pub fn new(text: &'static str) -> Result<Self> {
        for marker in [RULES_MARKER, DEFINES_MARKER] {
            let occurrences = text.matches(marker).count();
            if occurrences != 1 {
                return Err(PacError::TemplateInvariant {
                    marker,
                    occurrences,
                });
            }
        }
        Ok(Self { text })
    }

    /// The built-in template.
    pub fn builtin() -> Result<Self> {
        Self::new(BUILTIN_TEMPLATE)
    }

    /// Substitutes the compiled rules and proxy string.
    ///
    /// Both markers are located in the template before any substitution, so
    /// marker text inside `rules` or `defines` is copied through verbatim.
    pub fn render(&self, rules: &str, defines: &str) -> String {
        let mut substitutions: Vec<(usize, &str, &str)> =
            [(RULES_MARKER, rules), (DEFINES_MARKER, defines)]
                .into_iter()
                .filter_map(|(marker, value)| {
                    self.text.find(marker).map(|at| (at, marker, value))
                })
                .collect();
        substitutions.sort_by_key(|(at, _, _)| *at);

        let mut script = String::with_capacity(self.text.len() + rules.len() + defines.len());
        let mut cursor = 0;
        for (at, marker, value) in substitutions {
            script.push_str(&self.text[cursor..at]);
            script.push_str(value);
            cursor = at + marker.len();
        }
        script.push_str(&self.text[cursor..]);
        script
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_valid() {
        assert!(PacTemplate::builtin().is_ok());
    }

    #[test]
    fn test_missing_marker() {
        let err = PacTemplate::new("return \"/*{PROXY-DEFINES}*/\";").unwrap_err();
        assert!(matches!(
            err,
            PacError::TemplateInvariant {
                marker: RULES_MARKER,
                occurrences: 0
            }
        ));
    }

    #[test]
    fn test_repeated_marker() {
        let err = PacTemplate::new("/*{PROXY-RULES}*/ /*{PROXY-RULES}*/ /*{PROXY-DEFINES}*/")
            .unwrap_err();
        assert!(matches!(err, PacError::TemplateInvariant { occurrences: 2, .. }));
    }

    #[test]
    fn test_render_replaces_both_markers() {
        let template = PacTemplate::builtin().unwrap();
        let script = template.render("if (x) return \"+PACHost\";", "PROXY 10.0.0.1:3128");

        assert!(!script.contains(RULES_MARKER));
        assert!(!script.contains(DEFINES_MARKER));
        assert!(script.contains("if (x) return \"+PACHost\";"));
        assert!(script.contains("return \"PROXY 10.0.0.1:3128\";"));
    }

    #[test]
    fn test_render_ignores_markers_in_input() {
        let template = PacTemplate::builtin().unwrap();
        let script = template.render(DEFINES_MARKER, "DIRECT");
        assert_eq!(script.matches(DEFINES_MARKER).count(), 1);
        assert!(script.contains("return \"DIRECT\";\n    }\n});"));
    }

    #[test]
    fn test_render_custom_template() {
        let template = PacTemplate::new("[/*{PROXY-DEFINES}*/|/*{PROXY-RULES}*/]").unwrap();
        assert_eq!(template.render("r", "d"), "[d|r]");
    }
}
