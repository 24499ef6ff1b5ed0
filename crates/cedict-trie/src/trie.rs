use std::collections::HashMap;

/// A node of the prefix tree.
///
/// Children are keyed by a single character. The terminal slot is a separate
/// field, so no input character can be mistaken for an end-of-key marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrieNode {
    pub(crate) children: HashMap<char, TrieNode>,
    pub(crate) value: Option<String>,
}

impl TrieNode {
    /// Value stored for the key ending at this node, if any.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn child(&self, ch: char) -> Option<&TrieNode> {
        self.children.get(&ch)
    }

    /// Children in map order. Use [`TrieNode::sorted_children`] when the order
    /// must be reproducible.
    pub fn children(&self) -> impl Iterator<Item = (char, &TrieNode)> + '_ {
        self.children.iter().map(|(ch, node)| (*ch, node))
    }

    /// Children ordered by character.
    pub fn sorted_children(&self) -> Vec<(char, &TrieNode)> {
        let mut children: Vec<(char, &TrieNode)> = self.children().collect();
        children.sort_unstable_by_key(|(ch, _)| *ch);
        children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Append to the terminal slot. Returns `true` when the slot was empty.
    fn push_value(&mut self, value: &str) -> bool {
        match &mut self.value {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(value);
                false
            }
            None => {
                self.value = Some(value.to_string());
                true
            }
        }
    }

    fn count_nodes(&self) -> usize {
        1 + self.children.values().map(TrieNode::count_nodes).sum::<usize>()
    }
}

/// Longest valued prefix found by [`Trie::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<'a> {
    pub word: String,
    pub value: &'a str,
    pub start: usize,
    pub end: usize,
}

/// Character trie mapping keys to accumulated dictionary values.
///
/// Built once by repeated [`Trie::insert`] calls, then shared read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trie {
    root: TrieNode,
    len: usize,
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_root(root: TrieNode, len: usize) -> Self {
        Self { root, len }
    }

    pub fn root(&self) -> &TrieNode {
        &self.root
    }

    /// Number of distinct keys holding a value.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of nodes including the root.
    pub fn node_count(&self) -> usize {
        self.root.count_nodes()
    }

    /// Insert `value` under `key`.
    ///
    /// A second insert for the same key appends its value after a `'\n'`, so
    /// the first inserted value always comes first. The empty key stores its
    /// value in the root node.
    pub fn insert(&mut self, key: &str, value: &str) {
        let mut node = &mut self.root;
        for ch in key.chars() {
            node = node.children.entry(ch).or_default();
        }
        if node.push_value(value) {
            self.len += 1;
        }
    }

    /// Exact lookup of a whole key.
    pub fn get(&self, key: &str) -> Option<&str> {
        let mut node = &self.root;
        for ch in key.chars() {
            node = node.children.get(&ch)?;
        }
        node.value()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Longest key starting at code-point offset `start` of `text` that holds
    /// a value.
    ///
    /// Paths through the trie that never reach a value are discarded, and a
    /// zero-length match (a value stored under the empty key) is never
    /// reported. Returns `None` when `start` is past the end of `text`.
    pub fn lookup(&self, text: &[char], start: usize) -> Option<Match<'_>> {
        if start > text.len() {
            return None;
        }

        let mut node = &self.root;
        let mut best: Option<(usize, &str)> = None;
        let mut i = start;
        loop {
            if i > start
                && let Some(value) = node.value()
            {
                best = Some((i, value));
            }
            let Some(next) = text.get(i).and_then(|ch| node.children.get(ch)) else {
                break;
            };
            node = next;
            i += 1;
        }

        best.map(|(end, value)| Match {
            word: text[start..end].iter().collect(),
            value,
            start,
            end,
        })
    }

    /// [`Trie::lookup`] over a `&str`; `start` is still a code-point offset.
    pub fn lookup_str(&self, text: &str, start: usize) -> Option<Match<'_>> {
        let chars: Vec<char> = text.chars().collect();
        self.lookup(&chars, start)
    }

    /// All `(key, value)` pairs in canonical order: a node's own value before
    /// its children, children by character.
    pub fn entries(&self) -> Vec<(String, &str)> {
        let mut out = Vec::with_capacity(self.len);
        let mut path = String::new();
        collect_entries(&self.root, &mut path, &mut out);
        out
    }
}

fn collect_entries<'a>(node: &'a TrieNode, path: &mut String, out: &mut Vec<(String, &'a str)>) {
    if let Some(value) = node.value() {
        out.push((path.clone(), value));
    }
    for (ch, child) in node.sorted_children() {
        path.push(ch);
        collect_entries(child, path, out);
        path.pop();
    }
}

impl<K, V> Extend<(K, V)> for Trie
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key.as_ref(), value.as_ref());
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Trie
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut trie = Trie::new();
        trie.extend(iter);
        trie
    }
}
