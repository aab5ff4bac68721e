use super::error::DeclarationError;

/// One value in a hierarchy and its children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyNode {
    pub value: String,
    pub children: Vec<HierarchyNode>,
}

/// Row of the nested-set helper table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedSetRow {
    pub value: String,
    pub left: i64,
    pub right: i64,
}

/// Tree of allowed values for a hierarchy field, written as a bulleted list:
///
/// ```text
/// *Animals
/// **Dogs
/// **Cats
/// *Plants
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HierarchyTree {
    pub roots: Vec<HierarchyNode>,
}

impl HierarchyTree {
    pub fn parse(structure: &str) -> Result<Self, DeclarationError> {
        // (depth, node) stack of currently open nodes
        let mut stack: Vec<(usize, HierarchyNode)> = Vec::new();
        let mut roots = Vec::new();

        for line in structure.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let depth = line.chars().take_while(|c| *c == '*').count();
            let value = line[depth..].trim();
            if depth == 0 {
                return Err(DeclarationError::BadHierarchy(format!(
                    "line '{line}' does not start with '*'"
                )));
            }
            if value.is_empty() {
                return Err(DeclarationError::BadHierarchy("empty value".to_string()));
            }
            let current_depth = stack.last().map_or(0, |(d, _)| *d);
            if depth > current_depth + 1 {
                return Err(DeclarationError::BadHierarchy(format!(
                    "'{value}' is nested more than one level below its parent"
                )));
            }

            while stack.last().is_some_and(|(d, _)| *d >= depth) {
                Self::close_top(&mut stack, &mut roots);
            }
            stack.push((
                depth,
                HierarchyNode {
                    value: value.to_string(),
                    children: Vec::new(),
                },
            ));
        }
        while !stack.is_empty() {
            Self::close_top(&mut stack, &mut roots);
        }

        if roots.is_empty() {
            return Err(DeclarationError::BadHierarchy("no values".to_string()));
        }
        Ok(Self { roots })
    }

    fn close_top(stack: &mut Vec<(usize, HierarchyNode)>, roots: &mut Vec<HierarchyNode>) {
        if let Some((_, node)) = stack.pop() {
            match stack.last_mut() {
                Some((_, parent)) => parent.children.push(node),
                None => roots.push(node),
            }
        }
    }

    /// All values in pre-order
    #[must_use]
    pub fn all_values(&self) -> Vec<String> {
        fn walk(node: &HierarchyNode, out: &mut Vec<String>) {
            out.push(node.value.clone());
            for child in &node.children {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        for root in &self.roots {
            walk(root, &mut out);
        }
        out
    }

    /// Nested-set numbering: a node contains every node whose
    /// (left, right) range lies inside its own.
    #[must_use]
    pub fn nested_set(&self) -> Vec<NestedSetRow> {
        fn walk(node: &HierarchyNode, counter: &mut i64, out: &mut Vec<NestedSetRow>) {
            let idx = out.len();
            out.push(NestedSetRow {
                value: node.value.clone(),
                left: *counter,
                right: 0,
            });
            *counter += 1;
            for child in &node.children {
                walk(child, counter, out);
            }
            out[idx].right = *counter;
            *counter += 1;
        }
        let mut out = Vec::new();
        let mut counter = 1;
        for root in &self.roots {
            walk(root, &mut counter, &mut out);
        }
        out
    }

    /// Back to the bulleted form
    #[must_use]
    pub fn to_structure(&self) -> String {
        fn walk(node: &HierarchyNode, depth: usize, lines: &mut Vec<String>) {
            lines.push(format!("{}{}", "*".repeat(depth), node.value));
            for child in &node.children {
                walk(child, depth + 1, lines);
            }
        }
        let mut lines = Vec::new();
        for root in &self.roots {
            walk(root, 1, &mut lines);
        }
        lines.join("\n")
    }
}
