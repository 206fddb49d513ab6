//! Text-format parsing: the symmetry graph, the variable / value /
//! prefix declarations, and the CNF-mode normalizations.

use crate::error::InputError;
use crate::graph::ColoredGraph;
use crate::reducer::Instance;
use std::io::BufRead;

/// Line-oriented reader over the input stream, shared by the section
/// parsers so they consume one stream in order.
pub struct Input<R> {
    source: R,
}

impl<R: BufRead> Input<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    /// Next line with the trailing newline removed; `None` at end of input.
    pub fn next_line(&mut self) -> Result<Option<String>, InputError> {
        let mut buf = String::new();
        if self.source.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        while buf.ends_with('\n') || buf.ends_with('\r') {
            buf.pop();
        }
        Ok(Some(buf))
    }

    /// Next non-blank line that is not a `c` comment line.
    pub fn next_content_line(&mut self) -> Result<Option<String>, InputError> {
        while let Some(line) = self.next_line()? {
            if line.starts_with('c') || line.trim().is_empty() {
                continue;
            }
            return Ok(Some(line));
        }
        Ok(None)
    }

    /// Fields of the next non-blank line. Comment lines are not skipped:
    /// outside the CNF section a leading `c` means a color line.
    fn require_fields(&mut self, what: &str) -> Result<Vec<String>, InputError> {
        while let Some(line) = self.next_line()? {
            if line.trim().is_empty() {
                continue;
            }
            return Ok(line.split_whitespace().map(str::to_string).collect());
        }
        Err(InputError::Syntax(format!("{what} expected")))
    }
}

fn parse_number(token: &str, what: &str) -> Result<i64, InputError> {
    token
        .parse()
        .map_err(|_| InputError::Syntax(format!("{what} expected")))
}

/// Parse a `p edge` graph: edges first, then exactly one color per vertex.
pub fn parse_graph<R: BufRead>(input: &mut Input<R>) -> Result<ColoredGraph, InputError> {
    let header = input.require_fields("graph format line")?;
    let (n, m) = match header.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["p", "edge", n, m] => (
            parse_number(n, "graph format line")?,
            parse_number(m, "graph format line")?,
        ),
        _ => return Err(InputError::Syntax("graph format line expected".into())),
    };
    if n <= 1 || m < 0 {
        return Err(InputError::Syntax(format!("bad graph parameters n = {n}, m = {m}")));
    }
    let n = n as usize;

    let mut edges = vec![];
    for _ in 0..m {
        let fields = input.require_fields("edge line")?;
        let (u, v) = match fields.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["e", u, v] => (parse_number(u, "edge line")?, parse_number(v, "edge line")?),
            _ => return Err(InputError::Syntax("edge line expected".into())),
        };
        if u < 1 || v < 1 || u == v || u > n as i64 || v > n as i64 {
            return Err(InputError::Syntax(format!("bad edge u = {u}, v = {v}")));
        }
        edges.push((u as usize - 1, v as usize - 1));
    }

    let mut colors = vec![None; n];
    for _ in 0..n {
        let fields = input.require_fields("color line")?;
        let (u, k) = match fields.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["c", u, k] => (parse_number(u, "color line")?, parse_number(k, "color line")?),
            _ => return Err(InputError::Syntax("color line expected".into())),
        };
        if u < 1 || u > n as i64 || k < 0 {
            return Err(InputError::Syntax(format!("bad color u = {u}, c = {k}")));
        }
        let u = u as usize - 1;
        if colors[u].replace(k as usize).is_some() {
            return Err(InputError::Syntax(format!("vertex u = {} received two colors", u + 1)));
        }
    }
    if let Some(u) = colors.iter().position(Option::is_none) {
        return Err(InputError::Syntax(format!("vertex u = {} did not receive a color", u + 1)));
    }

    let mut graph = ColoredGraph::empty(colors.into_iter().map(Option::unwrap));
    for (u, v) in edges {
        if !graph.insert_edge((u, v)) {
            return Err(InputError::Syntax(format!("bad edge u = {}, v = {}", u + 1, v + 1)));
        }
    }
    Ok(graph)
}

/// Parse the symmetry graph followed by the `p variable` and `p value`
/// declarations into an instance with an empty prefix.
pub fn parse_symmetry_instance<R: BufRead>(input: &mut Input<R>) -> Result<Instance, InputError> {
    let base = parse_graph(input)?;
    let n = base.len();

    let header = input.require_fields("variable format line")?;
    let v = match header.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["p", "variable", v] => parse_number(v, "variable format line")?,
        _ => return Err(InputError::Syntax("variable format line expected".into())),
    };
    if v < 1 {
        return Err(InputError::BadVariableCount(v.max(0) as usize));
    }
    let mut variables = vec![];
    let mut var_legends = vec![];
    for _ in 0..v {
        let fields = input.require_fields("variable line")?;
        match fields.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["v", u, tag] => {
                let u = parse_number(u, "variable line")?;
                if u < 1 || u > n as i64 {
                    return Err(InputError::VertexOutOfRange(u.max(0) as usize));
                }
                variables.push(u as usize - 1);
                var_legends.push(tag.to_string());
            }
            _ => return Err(InputError::Syntax("variable line expected".into())),
        }
    }

    let header = input.require_fields("value format line")?;
    let r = match header.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["p", "value", r] => parse_number(r, "value format line")?,
        _ => return Err(InputError::Syntax("value format line expected".into())),
    };
    if r < 1 {
        return Err(InputError::BadValueCount(r.max(0) as usize));
    }
    let mut values = vec![];
    let mut val_legends = vec![];
    for _ in 0..r {
        let fields = input.require_fields("value line")?;
        match fields.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["r", u, tag] => {
                let u = parse_number(u, "value line")?;
                if u < 1 || u > n as i64 {
                    return Err(InputError::VertexOutOfRange(u.max(0) as usize));
                }
                values.push(u as usize - 1);
                val_legends.push(tag.to_string());
            }
            _ => return Err(InputError::Syntax("value line expected".into())),
        }
    }

    Ok(Instance {
        base,
        variables,
        var_legends,
        values,
        val_legends,
        prefix: vec![],
        preset_values: vec![],
        target_length: 0,
        threshold: 0,
    })
}

/// A parsed `p prefix` record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PrefixSpec {
    pub prefix: Vec<usize>,
    /// Declared values of the leading `a`-line positions, range checked
    /// and otherwise unused.
    pub preset_values: Vec<usize>,
    pub threshold: u64,
}

pub fn parse_prefix<R: BufRead>(input: &mut Input<R>, n: usize) -> Result<PrefixSpec, InputError> {
    let header = input.require_fields("prefix format line")?;
    let (k, a, t) = match header.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["p", "prefix", k, a, t] => (
            parse_number(k, "prefix format line")?,
            parse_number(a, "prefix format line")?,
            parse_number(t, "prefix format line")?,
        ),
        _ => return Err(InputError::Syntax("prefix format line expected".into())),
    };
    if k < 0 || a < 0 || a > k || t < 0 {
        return Err(InputError::Syntax(format!("bad prefix parameters k = {k}, a = {a}, t = {t}")));
    }

    let mut prefix = vec![];
    let mut preset_values = vec![];
    for _ in 0..a {
        let fields = input.require_fields("assignment line")?;
        match fields.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["a", u, w] => {
                let u = parse_number(u, "assignment line")?;
                let w = parse_number(w, "assignment line")?;
                if u < 1 || u > n as i64 || w < 1 || w > n as i64 {
                    return Err(InputError::Syntax(format!("bad assignment u = {u}, w = {w}")));
                }
                prefix.push(u as usize - 1);
                preset_values.push(w as usize - 1);
            }
            _ => return Err(InputError::Syntax("assignment line expected".into())),
        }
    }
    for _ in a..k {
        let fields = input.require_fields("prefix line")?;
        match fields.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["f", u] => {
                let u = parse_number(u, "prefix line")?;
                if u < 1 || u > n as i64 {
                    return Err(InputError::Syntax(format!("bad assignment u = {u}")));
                }
                prefix.push(u as usize - 1);
            }
            _ => return Err(InputError::Syntax("prefix line expected".into())),
        }
    }
    Ok(PrefixSpec { prefix, preset_values, threshold: t as u64 })
}

/// CNF mode requires exactly the boolean value range; reorder it so
/// false sits at position 0 and true at position 1.
pub fn normalize_boolean_values(instance: &mut Instance) -> Result<(), InputError> {
    if instance.values.len() != 2 {
        return Err(InputError::NonBooleanValues);
    }
    let legends = (instance.val_legends[0].as_str(), instance.val_legends[1].as_str());
    match legends {
        ("false", "true") => Ok(()),
        ("true", "false") => {
            instance.values.swap(0, 1);
            instance.val_legends.swap(0, 1);
            Ok(())
        }
        _ => Err(InputError::NonBooleanValues),
    }
}

/// Translation from graph vertices to 0-indexed CNF variables, read off
/// the variable legends. Every legend must name a distinct CNF variable.
pub fn cnf_translation(
    instance: &Instance,
    num_vars: usize,
) -> Result<Vec<Option<usize>>, InputError> {
    let mut translation = vec![None; instance.base.len()];
    let mut seen = vec![];
    for (&vertex, legend) in instance.variables.iter().zip(&instance.var_legends) {
        let u: i64 = legend
            .parse()
            .map_err(|_| InputError::BadVariableLegend(legend.clone()))?;
        if u < 1 || u as usize > num_vars {
            return Err(InputError::CnfVariableOutOfRange(u));
        }
        translation[vertex] = Some(u as usize - 1);
        seen.push(u as usize);
    }
    seen.sort_unstable();
    if let Some(w) = seen.windows(2).find(|w| w[0] == w[1]) {
        return Err(InputError::RepeatedCnfVariable(w[0]));
    }
    Ok(translation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(text: &str) -> Input<&[u8]> {
        Input::new(text.as_bytes())
    }

    const GRAPH: &str = "p edge 4 3\ne 1 2\ne 2 3\ne 3 4\nc 1 0\nc 2 0\nc 3 0\nc 4 0\n";

    #[test]
    fn parses_graph_with_colors() {
        let g = parse_graph(&mut reader(GRAPH)).unwrap();
        assert_eq!(g.len(), 4);
        assert_eq!(g.edges(), vec![(0, 1), (1, 2), (2, 3)]);
        assert!(g.colors().all(|c| c == 0));
    }

    #[test]
    fn rejects_missing_color() {
        let text = "p edge 2 1\ne 1 2\nc 1 0\nc 1 1\n";
        assert!(parse_graph(&mut reader(text)).is_err());
    }

    #[test]
    fn rejects_bad_edges() {
        assert!(parse_graph(&mut reader("p edge 2 1\ne 1 1\nc 1 0\nc 2 0\n")).is_err());
        assert!(parse_graph(&mut reader("p edge 2 1\ne 1 3\nc 1 0\nc 2 0\n")).is_err());
        let dup = "p edge 3 2\ne 1 2\ne 2 1\nc 1 0\nc 2 0\nc 3 0\n";
        assert!(parse_graph(&mut reader(dup)).is_err());
    }

    #[test]
    fn parses_declarations_and_prefix() {
        let text = format!(
            "{GRAPH}p variable 2\nv 1 x\nv 4 y\np value 2\nr 2 false\nr 3 true\n\
             p prefix 2 1 7\na 1 2\nf 4\n"
        );
        let mut input = reader(&text);
        let instance = parse_symmetry_instance(&mut input).unwrap();
        assert_eq!(instance.variables, vec![0, 3]);
        assert_eq!(instance.var_legends, vec!["x", "y"]);
        assert_eq!(instance.values, vec![1, 2]);

        let spec = parse_prefix(&mut input, instance.base.len()).unwrap();
        assert_eq!(spec.prefix, vec![0, 3]);
        assert_eq!(spec.preset_values, vec![1]);
        assert_eq!(spec.threshold, 7);
    }

    #[test]
    fn rejects_bad_prefix_parameters() {
        let mut input = reader("p prefix 1 2 0\n");
        assert!(parse_prefix(&mut input, 4).is_err());
    }

    #[test]
    fn normalizes_value_order() {
        let mut instance = Instance {
            base: ColoredGraph::empty([0, 1, 2]),
            variables: vec![0],
            var_legends: vec!["1".into()],
            values: vec![1, 2],
            val_legends: vec!["true".into(), "false".into()],
            prefix: vec![],
            preset_values: vec![],
            target_length: 1,
            threshold: 0,
        };
        normalize_boolean_values(&mut instance).unwrap();
        assert_eq!(instance.values, vec![2, 1]);
        assert_eq!(instance.val_legends, vec!["false", "true"]);

        instance.val_legends = vec!["no".into(), "yes".into()];
        assert!(matches!(
            normalize_boolean_values(&mut instance).unwrap_err(),
            InputError::NonBooleanValues
        ));
    }

    #[test]
    fn translates_variable_legends() {
        let instance = Instance {
            base: ColoredGraph::empty([0, 0, 1, 2]),
            variables: vec![1, 0],
            var_legends: vec!["2".into(), "1".into()],
            values: vec![2, 3],
            val_legends: vec!["false".into(), "true".into()],
            prefix: vec![],
            preset_values: vec![],
            target_length: 1,
            threshold: 0,
        };
        let trans = cnf_translation(&instance, 2).unwrap();
        assert_eq!(trans, vec![Some(0), Some(1), None, None]);

        let mut bad = instance.clone();
        bad.var_legends[0] = "1".into();
        assert!(matches!(
            cnf_translation(&bad, 2).unwrap_err(),
            InputError::RepeatedCnfVariable(1)
        ));

        let mut bad = instance;
        bad.var_legends[0] = "9".into();
        assert!(matches!(
            cnf_translation(&bad, 2).unwrap_err(),
            InputError::CnfVariableOutOfRange(9)
        ));
    }
}
