//! An ordered map implemented with an AVL tree.

use std::borrow::Borrow;
use std::cmp::{self, Ordering};
use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::mem;
use std::ops::Index;
use std::ptr;

use tracing::debug;

use crate::arena::{Arena, Handle};
use crate::cursor::{self, Position};
use crate::error::{MapError, Result};

/// An ordered map implemented with an AVL tree.
///
/// Nodes live in an arena and refer to their parent and children by handle.
/// The tree stays height balanced after every insertion and removal.
///
/// ```
/// use assoc_maps::AvlTreeMap;
/// let mut map = AvlTreeMap::new();
/// map.insert(0, "zero").unwrap();
/// map.insert(1, "one").unwrap();
/// map.insert(2, "two").unwrap();
/// assert_eq!(map.get(&1), Some(&"one"));
/// map.remove(&1).unwrap();
/// assert!(map.get(&1).is_none());
/// ```
#[derive(Clone)]
pub struct AvlTreeMap<K, V> {
    nodes: Arena<Node<K>>,
    values: Arena<V>,
    root: Link,
    first: Link,
    last: Link,
    num_nodes: usize,
}

#[derive(Clone)]
struct Node<K> {
    key: K,
    value: Handle,
    left: Link,
    right: Link,
    parent: Link,
    height: usize,
}

type Link = Option<Handle>;

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

enum InsertPos {
    Occupied(Handle),
    Vacant(Link, Side),
}

/// The four ways a node can be out of balance after a single update.
/// Named after the path from the node into its taller grandchild.
enum Imbalance {
    LeftLeft,
    LeftRight,
    RightRight,
    RightLeft,
}

#[cfg(any(test, feature = "consistency_check"))]
#[allow(clippy::enum_variant_names)]
enum Direction {
    FromParent,
    FromLeft,
    FromRight,
}

/// A read-only cursor over the entries of an [`AvlTreeMap`] in key order.
///
/// Besides the entries, a cursor can rest on the end position, one past the
/// largest key. Moving beyond either end fails with
/// [`MapError::IteratorOutOfRange`].
pub struct Cursor<'a, K, V> {
    map: &'a AvlTreeMap<K, V>,
    position: Position,
}

/// A cursor over an [`AvlTreeMap`] with mutable access to values.
pub struct CursorMut<'a, K, V> {
    map: &'a mut AvlTreeMap<K, V>,
    position: Position,
}

/// An iterator over the entries of a map, sorted by key.
pub struct Iter<'a, K, V> {
    map: &'a AvlTreeMap<K, V>,
    front: Link,
    back: Link,
    remaining: usize,
}

/// A mutable iterator over the entries of a map, sorted by key.
pub struct IterMut<'a, K, V> {
    nodes: &'a Arena<Node<K>>,
    values: *mut Arena<V>,
    front: Link,
    back: Link,
    remaining: usize,
    marker: PhantomData<&'a mut V>,
}

impl<K, V> AvlTreeMap<K, V> {
    /// Creates an empty map.
    /// No memory is allocated until the first item is inserted.
    pub const fn new() -> Self {
        Self {
            nodes: Arena::new(),
            values: Arena::new(),
            root: None,
            first: None,
            last: None,
            num_nodes: 0,
        }
    }

    /// Returns true if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of elements in the map.
    pub fn len(&self) -> usize {
        self.num_nodes
    }

    /// Returns the height of the tree. A single node has height 0.
    pub fn height(&self) -> usize {
        match self.root {
            None => 0,
            Some(root) => self.nodes.get(root).height,
        }
    }

    /// Clears the map, deallocating all memory.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.values.clear();
        self.root = None;
        self.first = None;
        self.last = None;
        self.num_nodes = 0;
    }

    /// Returns the entry with the smallest key.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.first.map(|node| self.entry(node))
    }

    /// Returns the entry with the largest key.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.last.map(|node| self.entry(node))
    }

    /// Gets an iterator over the entries of the map, sorted by key.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            map: self,
            front: self.first,
            back: self.last,
            remaining: self.num_nodes,
        }
    }

    /// Gets a mutable iterator over the entries of the map, sorted by key.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            front: self.first,
            back: self.last,
            remaining: self.num_nodes,
            nodes: &self.nodes,
            values: &mut self.values,
            marker: PhantomData,
        }
    }

    /// Returns a cursor on the entry with the smallest key,
    /// or on the end position if the map is empty.
    pub fn cursor_front(&self) -> Cursor<'_, K, V> {
        Cursor {
            map: self,
            position: Position::from_link(self.first),
        }
    }

    /// Returns a cursor on the end position.
    pub fn cursor_end(&self) -> Cursor<'_, K, V> {
        Cursor {
            map: self,
            position: Position::End,
        }
    }

    /// Returns a mutable cursor on the entry with the smallest key.
    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, K, V> {
        CursorMut {
            position: Position::from_link(self.first),
            map: self,
        }
    }

    fn entry(&self, node: Handle) -> (&K, &V) {
        let node = self.nodes.get(node);
        (&node.key, self.values.get(node.value))
    }

    fn relink_bounds(&mut self) {
        self.first = self.root.map(|root| leftmost(&self.nodes, root));
        self.last = self.root.map(|root| rightmost(&self.nodes, root));
    }

    /// Unlinks a node from the tree and returns its entry.
    fn remove_node(&mut self, node: Handle) -> (K, V) {
        debug_assert!(self.num_nodes >= 1);
        self.unlink_node(node);
        let node = self.nodes.take(node);
        self.num_nodes -= 1;
        self.relink_bounds();
        (node.key, self.values.take(node.value))
    }

    fn unlink_node(&mut self, node: Handle) {
        let (left, right, parent) = {
            let node = self.nodes.get(node);
            (node.left, node.right, node.parent)
        };

        // Check if node to-unlink has right sub tree
        if let Some(mut min_child) = right {
            // Find smallest child node in right sub tree
            let mut min_child_parent = node;
            while let Some(left) = self.nodes.get(min_child).left {
                min_child_parent = min_child;
                min_child = left;
            }

            // Smallest child node is stem or leaf, unlink from tree
            let min_child_right = self.nodes.get(min_child).right;
            let stem = self.nodes.get_mut(min_child_parent);
            if stem.left == Some(min_child) {
                stem.left = min_child_right;
            } else {
                stem.right = min_child_right;
            }
            if let Some(min_child_right) = min_child_right {
                self.nodes.get_mut(min_child_right).parent = Some(min_child_parent);
            }

            // Replace node to-unlink by smallest child node (up to 6 links)
            let (left, right) = {
                let node = self.nodes.get(node);
                (node.left, node.right)
            };
            let replacement = self.nodes.get_mut(min_child);
            replacement.left = left;
            replacement.right = right;
            replacement.parent = parent;
            if let Some(left) = left {
                self.nodes.get_mut(left).parent = Some(min_child);
            }
            if let Some(right) = right {
                self.nodes.get_mut(right).parent = Some(min_child);
            }
            self.replace_child(parent, node, Some(min_child));

            // Parent of smallest child node might be out of balance now
            let rebalance_from = if min_child_parent == node {
                // Parent is node to-unlink and has been replaced by smallest child
                min_child
            } else {
                min_child_parent
            };
            self.rebalance(Some(rebalance_from));
        } else {
            // Node to-unlink is stem or leaf, unlink from tree.
            if let Some(left) = left {
                self.nodes.get_mut(left).parent = parent;
            }
            self.replace_child(parent, node, left);
            // Parent node might be out of balance now
            self.rebalance(parent);
        }
    }

    /// Points the link of `parent` that referred to `old` at `new`.
    fn replace_child(&mut self, parent: Link, old: Handle, new: Link) {
        match parent {
            None => self.root = new,
            Some(parent) => {
                let parent = self.nodes.get_mut(parent);
                if parent.left == Some(old) {
                    parent.left = new;
                } else {
                    parent.right = new;
                }
            }
        }
    }

    fn left_height(&self, node: Handle) -> usize {
        match self.nodes.get(node).left {
            None => 0,
            Some(left) => self.nodes.get(left).height + 1,
        }
    }

    fn right_height(&self, node: Handle) -> usize {
        match self.nodes.get(node).right {
            None => 0,
            Some(right) => self.nodes.get(right).height + 1,
        }
    }

    fn adjust_height(&mut self, node: Handle) {
        let height = cmp::max(self.left_height(node), self.right_height(node));
        self.nodes.get_mut(node).height = height;
    }

    fn rotate_left(&mut self, node: Handle) {
        let Some(right) = self.nodes.get(node).right else {
            return;
        };

        let right_left = self.nodes.get(right).left;
        self.nodes.get_mut(node).right = right_left;
        if let Some(right_left) = right_left {
            self.nodes.get_mut(right_left).parent = Some(node);
        }

        let parent = self.nodes.get(node).parent;
        self.nodes.get_mut(right).parent = parent;
        self.replace_child(parent, node, Some(right));

        self.nodes.get_mut(right).left = Some(node);
        self.nodes.get_mut(node).parent = Some(right);

        self.adjust_height(node);
        self.adjust_height(right);
    }

    fn rotate_right(&mut self, node: Handle) {
        let Some(left) = self.nodes.get(node).left else {
            return;
        };

        let left_right = self.nodes.get(left).right;
        self.nodes.get_mut(node).left = left_right;
        if let Some(left_right) = left_right {
            self.nodes.get_mut(left_right).parent = Some(node);
        }

        let parent = self.nodes.get(node).parent;
        self.nodes.get_mut(left).parent = parent;
        self.replace_child(parent, node, Some(left));

        self.nodes.get_mut(left).right = Some(node);
        self.nodes.get_mut(node).parent = Some(left);

        self.adjust_height(node);
        self.adjust_height(left);
    }

    /// Rebalances nodes starting from given position up to the root node.
    fn rebalance(&mut self, start_from: Link) {
        let mut current = start_from;
        while let Some(node) = current {
            let parent = self.nodes.get(node).parent;
            self.rebalance_node(node);
            current = parent;
        }
    }

    /// Rebalances nodes starting from given position up to the root node.
    /// Stops after first rebalance operation.
    /// This is enough to restore balance after a single insert operation.
    fn rebalance_once(&mut self, start_from: Link) {
        let mut current = start_from;
        while let Some(node) = current {
            let parent = self.nodes.get(node).parent;
            if self.rebalance_node(node) {
                break;
            }
            current = parent;
        }
    }

    /// Restores AVL condition (balance) at given node if necessary and adjusts height.
    /// Resulting balance will be +1, 0 or -1 height difference between left and right subtree.
    /// Returns whether rebalancing had been necessary.
    fn rebalance_node(&mut self, node: Handle) -> bool {
        let Some(imbalance) = self.imbalance(node) else {
            self.adjust_height(node);
            return false;
        };

        let (left, right) = {
            let node = self.nodes.get(node);
            (node.left, node.right)
        };
        match imbalance {
            Imbalance::LeftLeft => self.rotate_right(node),
            Imbalance::LeftRight => {
                if let Some(left) = left {
                    self.rotate_left(left);
                }
                self.rotate_right(node);
            }
            Imbalance::RightRight => self.rotate_left(node),
            Imbalance::RightLeft => {
                if let Some(right) = right {
                    self.rotate_right(right);
                }
                self.rotate_left(node);
            }
        }
        true
    }

    fn imbalance(&self, node: Handle) -> Option<Imbalance> {
        let left_height = self.left_height(node);
        let right_height = self.right_height(node);
        debug_assert!(left_height <= right_height + 2);
        debug_assert!(right_height <= left_height + 2);

        if left_height > right_height + 1 {
            let left = self.nodes.get(node).left?;
            if self.right_height(left) > self.left_height(left) {
                Some(Imbalance::LeftRight)
            } else {
                Some(Imbalance::LeftLeft)
            }
        } else if right_height > left_height + 1 {
            let right = self.nodes.get(node).right?;
            if self.left_height(right) > self.right_height(right) {
                Some(Imbalance::RightLeft)
            } else {
                Some(Imbalance::RightRight)
            }
        } else {
            None
        }
    }

    #[cfg(any(test, feature = "consistency_check"))]
    fn preorder<F: FnMut(Handle)>(&self, f: F) {
        self.traverse(f, |_| {}, |_| {});
    }

    #[cfg(any(test, feature = "consistency_check"))]
    fn traverse<Pre, In, Post>(&self, mut preorder: Pre, mut inorder: In, mut postorder: Post)
    where
        Pre: FnMut(Handle),
        In: FnMut(Handle),
        Post: FnMut(Handle),
    {
        if let Some(mut node) = self.root {
            let mut dir = Direction::FromParent;
            loop {
                match dir {
                    Direction::FromParent => {
                        preorder(node);
                        if let Some(left) = self.nodes.get(node).left {
                            node = left;
                        } else {
                            dir = Direction::FromLeft;
                        }
                    }
                    Direction::FromLeft => {
                        inorder(node);
                        if let Some(right) = self.nodes.get(node).right {
                            node = right;
                            dir = Direction::FromParent;
                        } else {
                            dir = Direction::FromRight;
                        }
                    }
                    Direction::FromRight => {
                        postorder(node);
                        match self.nodes.get(node).parent {
                            Some(parent) => {
                                if self.nodes.get(parent).left == Some(node) {
                                    dir = Direction::FromLeft;
                                } else {
                                    dir = Direction::FromRight;
                                }
                                node = parent;
                            }
                            None => break,
                        }
                    }
                }
            }
        }
    }
}

impl<K: Ord, V> AvlTreeMap<K, V> {
    /// Builds a map from key-value pairs. Later pairs overwrite earlier ones with the same key.
    pub fn try_from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut map = Self::new();
        map.try_extend(entries)?;
        Ok(map)
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, but the ordering
    /// on the borrowed form *must* match the ordering on the key type.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_node(key).map(|node| self.entry(node).1)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.find_node(key)?;
        Some(self.values.get_mut(self.nodes.get(node).value))
    }

    /// Returns references to the key-value pair corresponding to the key.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_node(key).map(|node| self.entry(node))
    }

    /// Returns true if the key is in the map, else false.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_node(key).is_some()
    }

    /// Returns a cursor on the entry for the key, or on the end position if absent.
    pub fn find<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        Cursor {
            map: self,
            position: Position::from_link(self.find_node(key)),
        }
    }

    /// Returns a mutable cursor on the entry for the key, or on the end position if absent.
    pub fn find_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        CursorMut {
            position: Position::from_link(self.find_node(key)),
            map: self,
        }
    }

    /// Returns the value for the key or [`MapError::NotFound`].
    pub fn value_of<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).ok_or(MapError::NotFound)
    }

    /// Returns the value for the key mutably or [`MapError::NotFound`].
    pub fn value_of_mut<Q>(&mut self, key: &Q) -> Result<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_mut(key).ok_or(MapError::NotFound)
    }

    /// Returns the value for the key, inserting `V::default()` first if the key is absent.
    pub fn get_or_default(&mut self, key: K) -> Result<&mut V>
    where
        V: Default,
    {
        let node = match self.find_node(&key) {
            Some(node) => node,
            None => {
                let (node, _) = self.insert_node(key, V::default())?;
                self.relink_bounds();
                node
            }
        };
        Ok(self.values.get_mut(self.nodes.get(node).value))
    }

    /// Inserts a key-value pair into the map.
    /// Returns the previous value if the key was already present; the stored key is kept.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        let (_, previous) = self.insert_node(key, value)?;
        if previous.is_none() {
            self.relink_bounds();
        }
        Ok(previous)
    }

    /// Inserts every pair, relinking the first and last entries once at the end.
    ///
    /// Stops at the first allocation failure; pairs inserted before it stay in the map.
    pub fn try_extend<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let len_before = self.num_nodes;
        let result = entries
            .into_iter()
            .try_for_each(|(key, value)| self.insert_node(key, value).map(drop));
        self.relink_bounds();
        debug!(
            added = self.num_nodes - len_before,
            len = self.num_nodes,
            "bulk insert into tree map"
        );
        result
    }

    /// Removes a key from the map.
    /// Returns the value at the key if the key was previously in the map.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if self.num_nodes == 0 {
            return Err(MapError::EmptyContainer);
        }
        let node = self.find_node(key).ok_or(MapError::NotFound)?;
        let (_, value) = self.remove_node(node);
        debug_assert!(self.get(key).is_none());
        Ok(value)
    }

    /// Asserts that the internal tree structure is consistent.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        // Check root link
        if let Some(root) = self.root {
            assert!(self.nodes.get(root).parent.is_none());
        }

        // Check tree nodes
        let mut num_nodes = 0;
        self.preorder(|node| {
            let node_ref = self.nodes.get(node);
            let mut height = 0;
            let mut left_height = 0;
            let mut right_height = 0;

            // Check link for left child node
            if let Some(left) = node_ref.left {
                let left_ref = self.nodes.get(left);
                assert!(left_ref.parent == Some(node));
                assert!(left_ref.key < node_ref.key);
                left_height = left_ref.height + 1;
                height = cmp::max(height, left_height);
            }

            // Check link for right child node
            if let Some(right) = node_ref.right {
                let right_ref = self.nodes.get(right);
                assert!(right_ref.parent == Some(node));
                assert!(right_ref.key > node_ref.key);
                right_height = right_ref.height + 1;
                height = cmp::max(height, right_height);
            }

            // Check height
            assert_eq!(node_ref.height, height);

            // Check AVL condition (nearly balance)
            assert!(left_height <= right_height + 1);
            assert!(right_height <= left_height + 1);

            num_nodes += 1;
        });

        // Check number of nodes
        assert_eq!(num_nodes, self.num_nodes);
        assert_eq!(self.nodes.len(), self.num_nodes);
        assert_eq!(self.values.len(), self.num_nodes);

        // Check cached bounds
        assert_eq!(self.first, self.root.map(|root| leftmost(&self.nodes, root)));
        assert_eq!(self.last, self.root.map(|root| rightmost(&self.nodes, root)));
    }

    fn find_node<Q>(&self, key: &Q) -> Link
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut current = self.root;
        while let Some(node) = current {
            let node_ref = self.nodes.get(node);
            current = match key.cmp(node_ref.key.borrow()) {
                Ordering::Equal => break,
                Ordering::Less => node_ref.left,
                Ordering::Greater => node_ref.right,
            };
        }
        current
    }

    fn find_insert_pos(&self, key: &K) -> InsertPos {
        let mut parent = None;
        let mut side = Side::Left;
        let mut current = self.root;
        while let Some(node) = current {
            let node_ref = self.nodes.get(node);
            parent = Some(node);
            current = match key.cmp(&node_ref.key) {
                Ordering::Equal => return InsertPos::Occupied(node),
                Ordering::Less => {
                    side = Side::Left;
                    node_ref.left
                }
                Ordering::Greater => {
                    side = Side::Right;
                    node_ref.right
                }
            };
        }
        InsertPos::Vacant(parent, side)
    }

    /// Inserts without touching the cached bounds.
    /// Returns the node holding the key and the replaced value, if any.
    fn insert_node(&mut self, key: K, value: V) -> Result<(Handle, Option<V>)> {
        let (parent, side) = match self.find_insert_pos(&key) {
            InsertPos::Occupied(node) => {
                let slot = self.values.get_mut(self.nodes.get(node).value);
                return Ok((node, Some(mem::replace(slot, value))));
            }
            InsertPos::Vacant(parent, side) => (parent, side),
        };

        let value = self.values.try_alloc(value)?;
        let node = match self.nodes.try_alloc(Node::new(parent, key, value)) {
            Ok(node) => node,
            Err(err) => {
                self.values.free(value);
                return Err(err);
            }
        };

        match (parent, side) {
            (None, _) => self.root = Some(node),
            (Some(parent), Side::Left) => self.nodes.get_mut(parent).left = Some(node),
            (Some(parent), Side::Right) => self.nodes.get_mut(parent).right = Some(node),
        }
        self.num_nodes += 1;
        self.rebalance_once(parent);
        Ok((node, None))
    }
}

impl<K> Node<K> {
    fn new(parent: Link, key: K, value: Handle) -> Self {
        Node {
            key,
            value,
            parent,
            left: None,
            right: None,
            height: 0,
        }
    }
}

fn leftmost<K>(nodes: &Arena<Node<K>>, mut node: Handle) -> Handle {
    while let Some(left) = nodes.get(node).left {
        node = left;
    }
    node
}

fn rightmost<K>(nodes: &Arena<Node<K>>, mut node: Handle) -> Handle {
    while let Some(right) = nodes.get(node).right {
        node = right;
    }
    node
}

/// In-order successor: leftmost node of the right subtree, or the first
/// ancestor reached from a left child.
fn successor<K>(nodes: &Arena<Node<K>>, node: Handle) -> Link {
    if let Some(right) = nodes.get(node).right {
        return Some(leftmost(nodes, right));
    }
    let mut child = node;
    let mut parent = nodes.get(node).parent;
    while let Some(ancestor) = parent {
        if nodes.get(ancestor).left == Some(child) {
            return Some(ancestor);
        }
        child = ancestor;
        parent = nodes.get(ancestor).parent;
    }
    None
}

fn predecessor<K>(nodes: &Arena<Node<K>>, node: Handle) -> Link {
    if let Some(left) = nodes.get(node).left {
        return Some(rightmost(nodes, left));
    }
    let mut child = node;
    let mut parent = nodes.get(node).parent;
    while let Some(ancestor) = parent {
        if nodes.get(ancestor).right == Some(child) {
            return Some(ancestor);
        }
        child = ancestor;
        parent = nodes.get(ancestor).parent;
    }
    None
}

impl<'a, K, V> Cursor<'a, K, V> {
    /// Moves to the next entry, or to the end position after the last one.
    pub fn move_next(&mut self) -> Result<()> {
        let nodes = &self.map.nodes;
        self.position = cursor::step_next(self.position, |node| successor(nodes, node))?;
        Ok(())
    }

    /// Moves to the previous entry. From the end position this is the last entry.
    pub fn move_prev(&mut self) -> Result<()> {
        let nodes = &self.map.nodes;
        let last = self.map.last;
        self.position = cursor::step_prev(self.position, || last, |node| predecessor(nodes, node))?;
        Ok(())
    }

    /// Returns true if the cursor rests on the end position.
    pub fn is_end(&self) -> bool {
        self.position == Position::End
    }

    pub fn key(&self) -> Option<&'a K> {
        self.key_value().map(|(key, _)| key)
    }

    pub fn value(&self) -> Option<&'a V> {
        self.key_value().map(|(_, value)| value)
    }

    pub fn key_value(&self) -> Option<(&'a K, &'a V)> {
        let map = self.map;
        self.position.handle().map(|node| map.entry(node))
    }
}

impl<K, V> Clone for Cursor<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for Cursor<'_, K, V> {}

impl<K, V> PartialEq for Cursor<'_, K, V> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.map, other.map) && self.position == other.position
    }
}

impl<K, V> Eq for Cursor<'_, K, V> {}

impl<K, V> fmt::Debug for Cursor<'_, K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cursor").field(&self.key_value()).finish()
    }
}

impl<'a, K, V> CursorMut<'a, K, V> {
    /// Moves to the next entry, or to the end position after the last one.
    pub fn move_next(&mut self) -> Result<()> {
        let nodes = &self.map.nodes;
        self.position = cursor::step_next(self.position, |node| successor(nodes, node))?;
        Ok(())
    }

    /// Moves to the previous entry. From the end position this is the last entry.
    pub fn move_prev(&mut self) -> Result<()> {
        let nodes = &self.map.nodes;
        let last = self.map.last;
        self.position = cursor::step_prev(self.position, || last, |node| predecessor(nodes, node))?;
        Ok(())
    }

    pub fn is_end(&self) -> bool {
        self.position == Position::End
    }

    pub fn key(&self) -> Option<&K> {
        self.key_value().map(|(key, _)| key)
    }

    pub fn value(&self) -> Option<&V> {
        self.key_value().map(|(_, value)| value)
    }

    pub fn key_value(&self) -> Option<(&K, &V)> {
        self.position.handle().map(|node| self.map.entry(node))
    }

    pub fn value_mut(&mut self) -> Option<&mut V> {
        let node = self.position.handle()?;
        Some(self.map.values.get_mut(self.map.nodes.get(node).value))
    }

    /// Removes the current entry and moves to its successor.
    /// Fails with [`MapError::IteratorOutOfRange`] on the end position.
    pub fn remove_current(&mut self) -> Result<(K, V)> {
        let node = self.position.handle().ok_or(MapError::IteratorOutOfRange)?;
        let next = successor(&self.map.nodes, node);
        let entry = self.map.remove_node(node);
        self.position = Position::from_link(next);
        Ok(entry)
    }

    /// Returns a read-only cursor at the same position.
    pub fn as_cursor(&self) -> Cursor<'_, K, V> {
        Cursor {
            map: &*self.map,
            position: self.position,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.front?;
        self.front = successor(&self.map.nodes, node);
        self.remaining -= 1;
        Some(self.map.entry(node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.back?;
        self.back = predecessor(&self.map.nodes, node);
        self.remaining -= 1;
        Some(self.map.entry(node))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter { ..*self }
    }
}

impl<'a, K, V> IterMut<'a, K, V> {
    fn entry(&mut self, node: Handle) -> (&'a K, &'a mut V) {
        let nodes = self.nodes;
        let node = nodes.get(node);
        // SAFETY: `values` comes from a `&'a mut Arena<V>` and every node is
        // yielded at most once, so no two returned references alias.
        let value = unsafe { Arena::get_mut_ptr(self.values, node.value) };
        (&node.key, value)
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.front?;
        self.front = successor(self.nodes, node);
        self.remaining -= 1;
        Some(self.entry(node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for IterMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.back?;
        self.back = predecessor(self.nodes, node);
        self.remaining -= 1;
        Some(self.entry(node))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

impl<K, V> FusedIterator for IterMut<'_, K, V> {}

impl<'a, K, V> IntoIterator for &'a AvlTreeMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V> IntoIterator for &'a mut AvlTreeMap<K, V> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V> Default for AvlTreeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for AvlTreeMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq> Eq for AvlTreeMap<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for AvlTreeMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, Q> Index<&Q> for AvlTreeMap<K, V>
where
    K: Ord + Borrow<Q>,
    Q: Ord + ?Sized,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is not present in the map.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}
