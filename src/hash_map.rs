//! A hash map with separate chaining and a fixed number of buckets.

use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::mem;
use std::ops::Index;
use std::ptr;

use tracing::debug;

use crate::arena::{Arena, Handle};
use crate::cursor::{self, Position};
use crate::error::{MapError, Result};

/// Number of buckets used by [`ChainedHashMap::new`].
pub const DEFAULT_BUCKET_COUNT: usize = 10_000;

/// A hash map with separate chaining.
///
/// The bucket count is chosen at construction and never changes. Every
/// bucket holds a doubly linked list of entries in insertion order.
/// Iteration visits buckets in index order.
///
/// ```
/// use assoc_maps::ChainedHashMap;
/// let mut map = ChainedHashMap::with_bucket_count(16);
/// map.insert("one", 1).unwrap();
/// map.insert("two", 2).unwrap();
/// assert_eq!(map.get("one"), Some(&1));
/// assert_eq!(map.remove("two"), Ok(2));
/// assert!(map.get("two").is_none());
/// ```
#[derive(Clone)]
pub struct ChainedHashMap<K, V, S = RandomState> {
    buckets: Vec<Bucket>,
    entries: Arena<Entry<K>>,
    values: Arena<V>,
    num_entries: usize,
    hash_builder: S,
}

#[derive(Clone, Copy, Default)]
struct Bucket {
    head: Link,
    tail: Link,
    len: usize,
}

#[derive(Clone)]
struct Entry<K> {
    key: K,
    value: Handle,
    bucket: usize,
    prev: Link,
    next: Link,
}

type Link = Option<Handle>;

/// A read-only cursor over the entries of a [`ChainedHashMap`].
///
/// Besides the entries, a cursor can rest on the end position, one past the
/// last entry of the last non-empty bucket. Moving beyond either end fails
/// with [`MapError::IteratorOutOfRange`].
pub struct Cursor<'a, K, V, S = RandomState> {
    map: &'a ChainedHashMap<K, V, S>,
    position: Position,
}

/// A cursor over a [`ChainedHashMap`] with mutable access to values.
pub struct CursorMut<'a, K, V, S = RandomState> {
    map: &'a mut ChainedHashMap<K, V, S>,
    position: Position,
}

/// An iterator over the entries of a map in bucket order.
pub struct Iter<'a, K, V> {
    buckets: &'a [Bucket],
    entries: &'a Arena<Entry<K>>,
    values: &'a Arena<V>,
    front: Link,
    back: Link,
    remaining: usize,
}

/// A mutable iterator over the entries of a map in bucket order.
pub struct IterMut<'a, K, V> {
    buckets: &'a [Bucket],
    entries: &'a Arena<Entry<K>>,
    values: *mut Arena<V>,
    front: Link,
    back: Link,
    remaining: usize,
    marker: PhantomData<&'a mut V>,
}

impl<K, V> ChainedHashMap<K, V, RandomState> {
    /// Creates an empty map with [`DEFAULT_BUCKET_COUNT`] buckets.
    pub fn new() -> Self {
        Self::with_bucket_count(DEFAULT_BUCKET_COUNT)
    }

    /// Creates an empty map with the given number of buckets (at least one).
    pub fn with_bucket_count(bucket_count: usize) -> Self {
        Self::with_bucket_count_and_hasher(bucket_count, RandomState::new())
    }
}

impl<K, V, S> ChainedHashMap<K, V, S> {
    /// Creates an empty map with the given number of buckets (at least one)
    /// that hashes keys with `hash_builder`.
    pub fn with_bucket_count_and_hasher(bucket_count: usize, hash_builder: S) -> Self {
        let bucket_count = bucket_count.max(1);
        debug!(bucket_count, "creating chained hash map");
        Self {
            buckets: vec![Bucket::default(); bucket_count],
            entries: Arena::new(),
            values: Arena::new(),
            num_entries: 0,
            hash_builder,
        }
    }

    /// Returns the number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the number of entries in the bucket at `index`.
    pub fn bucket_len(&self, index: usize) -> Option<usize> {
        self.buckets.get(index).map(|bucket| bucket.len)
    }

    /// Returns the map's hasher.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Returns true if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.num_entries == 0
    }

    /// Returns the number of elements in the map.
    pub fn len(&self) -> usize {
        self.num_entries
    }

    /// Removes all entries. The bucket count is kept.
    pub fn clear(&mut self) {
        self.buckets.fill(Bucket::default());
        self.entries.clear();
        self.values.clear();
        self.num_entries = 0;
    }

    /// Gets an iterator over the entries of the map in bucket order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buckets: &self.buckets,
            entries: &self.entries,
            values: &self.values,
            front: first_from(&self.buckets, 0),
            back: last_before(&self.buckets, self.buckets.len()),
            remaining: self.num_entries,
        }
    }

    /// Gets a mutable iterator over the entries of the map in bucket order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            front: first_from(&self.buckets, 0),
            back: last_before(&self.buckets, self.buckets.len()),
            remaining: self.num_entries,
            buckets: &self.buckets,
            entries: &self.entries,
            values: &mut self.values,
            marker: PhantomData,
        }
    }

    /// Returns a cursor on the first entry, or on the end position if the map is empty.
    pub fn cursor_front(&self) -> Cursor<'_, K, V, S> {
        Cursor {
            map: self,
            position: Position::from_link(first_from(&self.buckets, 0)),
        }
    }

    /// Returns a cursor on the end position.
    pub fn cursor_end(&self) -> Cursor<'_, K, V, S> {
        Cursor {
            map: self,
            position: Position::End,
        }
    }

    /// Returns a mutable cursor on the first entry.
    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, K, V, S> {
        CursorMut {
            position: Position::from_link(first_from(&self.buckets, 0)),
            map: self,
        }
    }

    fn entry(&self, entry: Handle) -> (&K, &V) {
        let entry = self.entries.get(entry);
        (&entry.key, self.values.get(entry.value))
    }

    /// Unlinks an entry from its bucket and returns its contents.
    fn remove_entry_at(&mut self, handle: Handle) -> (K, V) {
        let entry = self.entries.take(handle);
        match entry.prev {
            Some(prev) => self.entries.get_mut(prev).next = entry.next,
            None => self.buckets[entry.bucket].head = entry.next,
        }
        match entry.next {
            Some(next) => self.entries.get_mut(next).prev = entry.prev,
            None => self.buckets[entry.bucket].tail = entry.prev,
        }
        self.buckets[entry.bucket].len -= 1;
        self.num_entries -= 1;
        (entry.key, self.values.take(entry.value))
    }
}

impl<K, V, S> ChainedHashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    /// Builds a map with one bucket per pair. Later pairs overwrite earlier ones with the same key.
    pub fn try_from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let entries: Vec<(K, V)> = entries.into_iter().collect();
        let mut map = Self::with_bucket_count_and_hasher(entries.len(), S::default());
        map.try_extend(entries)?;
        Ok(map)
    }
}

impl<K, V, S> ChainedHashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, but `Hash` and
    /// `Eq` on the borrowed form *must* match those for the key type.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_entry(key).map(|entry| self.entry(entry).1)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entry = self.find_entry(key)?;
        Some(self.values.get_mut(self.entries.get(entry).value))
    }

    /// Returns references to the key-value pair corresponding to the key.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_entry(key).map(|entry| self.entry(entry))
    }

    /// Returns true if the key is in the map, else false.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_entry(key).is_some()
    }

    /// Returns a cursor on the entry for the key, or on the end position if absent.
    pub fn find<Q>(&self, key: &Q) -> Cursor<'_, K, V, S>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Cursor {
            map: self,
            position: Position::from_link(self.find_entry(key)),
        }
    }

    /// Returns a mutable cursor on the entry for the key, or on the end position if absent.
    pub fn find_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V, S>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        CursorMut {
            position: Position::from_link(self.find_entry(key)),
            map: self,
        }
    }

    /// Returns the value for the key or [`MapError::NotFound`].
    pub fn value_of<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).ok_or(MapError::NotFound)
    }

    /// Returns the value for the key mutably or [`MapError::NotFound`].
    pub fn value_of_mut<Q>(&mut self, key: &Q) -> Result<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_mut(key).ok_or(MapError::NotFound)
    }

    /// Returns the value for the key, inserting `V::default()` first if the key is absent.
    pub fn get_or_default(&mut self, key: K) -> Result<&mut V>
    where
        V: Default,
    {
        let entry = match self.find_entry(&key) {
            Some(entry) => entry,
            None => self.push_entry(key, V::default())?,
        };
        Ok(self.values.get_mut(self.entries.get(entry).value))
    }

    /// Inserts a key-value pair into the map.
    /// Returns the previous value if the key was already present; the stored key is kept.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        if let Some(entry) = self.find_entry(&key) {
            let slot = self.values.get_mut(self.entries.get(entry).value);
            return Ok(Some(mem::replace(slot, value)));
        }
        self.push_entry(key, value)?;
        Ok(None)
    }

    /// Inserts every pair.
    ///
    /// Stops at the first allocation failure; pairs inserted before it stay in the map.
    pub fn try_extend<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let len_before = self.num_entries;
        let result = entries
            .into_iter()
            .try_for_each(|(key, value)| self.insert(key, value).map(drop));
        debug!(
            added = self.num_entries - len_before,
            len = self.num_entries,
            bucket_count = self.buckets.len(),
            "bulk insert into hash map"
        );
        result
    }

    /// Removes a key from the map.
    /// Returns the value at the key if the key was previously in the map.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entry = self.find_entry(key).ok_or(MapError::NotFound)?;
        let (_, value) = self.remove_entry_at(entry);
        Ok(value)
    }

    /// Asserts that every entry is linked into the bucket of its key's hash.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        let mut num_entries = 0;
        for (index, bucket) in self.buckets.iter().enumerate() {
            let mut len = 0;
            let mut prev = None;
            let mut current = bucket.head;
            while let Some(handle) = current {
                let entry = self.entries.get(handle);
                assert_eq!(entry.prev, prev);
                assert_eq!(entry.bucket, index);
                assert_eq!(self.bucket_index(&entry.key), index);

                // Keys are unique within a bucket
                let mut other = entry.next;
                while let Some(other_handle) = other {
                    let other_entry = self.entries.get(other_handle);
                    assert!(other_entry.key != entry.key);
                    other = other_entry.next;
                }

                len += 1;
                prev = current;
                current = entry.next;
            }
            assert_eq!(bucket.tail, prev);
            assert_eq!(bucket.len, len);
            num_entries += len;
        }

        assert_eq!(num_entries, self.num_entries);
        assert_eq!(self.entries.len(), self.num_entries);
        assert_eq!(self.values.len(), self.num_entries);
    }

    fn bucket_index<Q>(&self, key: &Q) -> usize
    where
        Q: Hash + ?Sized,
    {
        (self.hash_builder.hash_one(key) % self.buckets.len() as u64) as usize
    }

    fn find_entry<Q>(&self, key: &Q) -> Link
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut current = self.buckets[self.bucket_index(key)].head;
        while let Some(handle) = current {
            let entry = self.entries.get(handle);
            if entry.key.borrow() == key {
                break;
            }
            current = entry.next;
        }
        current
    }

    /// Appends a new entry to the tail of its bucket without checking for duplicates.
    fn push_entry(&mut self, key: K, value: V) -> Result<Handle> {
        let bucket = self.bucket_index(&key);
        let tail = self.buckets[bucket].tail;

        let value = self.values.try_alloc(value)?;
        let entry = Entry {
            key,
            value,
            bucket,
            prev: tail,
            next: None,
        };
        let handle = match self.entries.try_alloc(entry) {
            Ok(handle) => handle,
            Err(err) => {
                self.values.free(value);
                return Err(err);
            }
        };

        match tail {
            Some(tail) => self.entries.get_mut(tail).next = Some(handle),
            None => self.buckets[bucket].head = Some(handle),
        }
        let bucket = &mut self.buckets[bucket];
        bucket.tail = Some(handle);
        bucket.len += 1;
        self.num_entries += 1;
        Ok(handle)
    }
}

/// Head of the first non-empty bucket at or after `start`.
fn first_from(buckets: &[Bucket], start: usize) -> Link {
    buckets.get(start..)?.iter().find_map(|bucket| bucket.head)
}

/// Tail of the last non-empty bucket before `end`.
fn last_before(buckets: &[Bucket], end: usize) -> Link {
    buckets.get(..end)?.iter().rev().find_map(|bucket| bucket.tail)
}

fn successor<K>(buckets: &[Bucket], entries: &Arena<Entry<K>>, handle: Handle) -> Link {
    let entry = entries.get(handle);
    entry.next.or_else(|| first_from(buckets, entry.bucket + 1))
}

fn predecessor<K>(buckets: &[Bucket], entries: &Arena<Entry<K>>, handle: Handle) -> Link {
    let entry = entries.get(handle);
    entry.prev.or_else(|| last_before(buckets, entry.bucket))
}

impl<'a, K, V, S> Cursor<'a, K, V, S> {
    /// Moves to the next entry, or to the end position after the last one.
    pub fn move_next(&mut self) -> Result<()> {
        let map = self.map;
        self.position = cursor::step_next(self.position, |handle| {
            successor(&map.buckets, &map.entries, handle)
        })?;
        Ok(())
    }

    /// Moves to the previous entry. From the end position this is the last entry.
    pub fn move_prev(&mut self) -> Result<()> {
        let map = self.map;
        self.position = cursor::step_prev(
            self.position,
            || last_before(&map.buckets, map.buckets.len()),
            |handle| predecessor(&map.buckets, &map.entries, handle),
        )?;
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
        self.position.handle().map(|handle| map.entry(handle))
    }
}

impl<K, V, S> Clone for Cursor<'_, K, V, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V, S> Copy for Cursor<'_, K, V, S> {}

impl<K, V, S> PartialEq for Cursor<'_, K, V, S> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.map, other.map) && self.position == other.position
    }
}

impl<K, V, S> Eq for Cursor<'_, K, V, S> {}

impl<K, V, S> fmt::Debug for Cursor<'_, K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cursor").field(&self.key_value()).finish()
    }
}

impl<K, V, S> CursorMut<'_, K, V, S> {
    /// Moves to the next entry, or to the end position after the last one.
    pub fn move_next(&mut self) -> Result<()> {
        let map = &*self.map;
        self.position = cursor::step_next(self.position, |handle| {
            successor(&map.buckets, &map.entries, handle)
        })?;
        Ok(())
    }

    /// Moves to the previous entry. From the end position this is the last entry.
    pub fn move_prev(&mut self) -> Result<()> {
        let map = &*self.map;
        self.position = cursor::step_prev(
            self.position,
            || last_before(&map.buckets, map.buckets.len()),
            |handle| predecessor(&map.buckets, &map.entries, handle),
        )?;
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
        self.position.handle().map(|handle| self.map.entry(handle))
    }

    pub fn value_mut(&mut self) -> Option<&mut V> {
        let handle = self.position.handle()?;
        Some(self.map.values.get_mut(self.map.entries.get(handle).value))
    }

    /// Removes the current entry and moves to the entry after it.
    /// Fails with [`MapError::IteratorOutOfRange`] on the end position.
    pub fn remove_current(&mut self) -> Result<(K, V)> {
        let handle = self.position.handle().ok_or(MapError::IteratorOutOfRange)?;
        let next = successor(&self.map.buckets, &self.map.entries, handle);
        let entry = self.map.remove_entry_at(handle);
        self.position = Position::from_link(next);
        Ok(entry)
    }

    /// Returns a read-only cursor at the same position.
    pub fn as_cursor(&self) -> Cursor<'_, K, V, S> {
        Cursor {
            map: &*self.map,
            position: self.position,
        }
    }
}

impl<'a, K, V> Iter<'a, K, V> {
    fn entry(&self, handle: Handle) -> (&'a K, &'a V) {
        let entry = self.entries.get(handle);
        (&entry.key, self.values.get(entry.value))
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let handle = self.front?;
        self.front = successor(self.buckets, self.entries, handle);
        self.remaining -= 1;
        Some(self.entry(handle))
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
        let handle = self.back?;
        self.back = predecessor(self.buckets, self.entries, handle);
        self.remaining -= 1;
        Some(self.entry(handle))
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
    fn entry(&mut self, handle: Handle) -> (&'a K, &'a mut V) {
        let entry = self.entries.get(handle);
        // SAFETY: `values` comes from a `&'a mut Arena<V>` and every entry is
        // yielded at most once, so no two returned references alias.
        let value = unsafe { Arena::get_mut_ptr(self.values, entry.value) };
        (&entry.key, value)
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let handle = self.front?;
        self.front = successor(self.buckets, self.entries, handle);
        self.remaining -= 1;
        Some(self.entry(handle))
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
        let handle = self.back?;
        self.back = predecessor(self.buckets, self.entries, handle);
        self.remaining -= 1;
        Some(self.entry(handle))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

impl<K, V> FusedIterator for IterMut<'_, K, V> {}

impl<'a, K, V, S> IntoIterator for &'a ChainedHashMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut ChainedHashMap<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, S: Default> Default for ChainedHashMap<K, V, S> {
    fn default() -> Self {
        Self::with_bucket_count_and_hasher(DEFAULT_BUCKET_COUNT, S::default())
    }
}

/// Maps are equal when they hold the same entries and have the same bucket count.
impl<K, V, S> PartialEq for ChainedHashMap<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.bucket_count() == other.bucket_count()
            && other
                .iter()
                .all(|(key, value)| self.get(key).is_some_and(|own| own == value))
    }
}

impl<K, V, S> Eq for ChainedHashMap<K, V, S>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
{
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for ChainedHashMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S, Q> Index<&Q> for ChainedHashMap<K, V, S>
where
    K: Hash + Eq + Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    S: BuildHasher,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is not present in the map.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::hash::BuildHasherDefault;

    /// Hashes integers to themselves, so tests can place keys in known buckets.
    #[derive(Default)]
    struct IdentityHasher(u64);

    impl std::hash::Hasher for IdentityHasher {
        fn write(&mut self, bytes: &[u8]) {
            for byte in bytes.iter().rev() {
                self.0 = (self.0 << 8) | u64::from(*byte);
            }
        }

        fn write_u64(&mut self, n: u64) {
            self.0 = n;
        }

        fn write_i32(&mut self, n: i32) {
            self.0 = n as u64;
        }

        fn finish(&self) -> u64 {
            self.0
        }
    }

    type IdentityState = BuildHasherDefault<IdentityHasher>;

    fn identity_map(bucket_count: usize) -> ChainedHashMap<i32, &'static str, IdentityState> {
        ChainedHashMap::with_bucket_count_and_hasher(bucket_count, IdentityState::default())
    }

    #[test]
    fn test_bucket_order() {
        let mut map = identity_map(4);
        for (key, value) in [(5, "e"), (2, "b"), (1, "a"), (6, "f"), (9, "i")] {
            map.insert(key, value).unwrap();
        }
        map.check_consistency();

        // Bucket 1 holds 5, 1, 9 in insertion order; bucket 2 holds 2, 6.
        let keys: Vec<i32> = map.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec![5, 1, 9, 2, 6]);
        assert_eq!(map.bucket_len(0), Some(0));
        assert_eq!(map.bucket_len(1), Some(3));
        assert_eq!(map.bucket_len(2), Some(2));
        assert_eq!(map.bucket_len(4), None);

        let reversed: Vec<i32> = map.iter().rev().map(|(key, _)| *key).collect();
        assert_eq!(reversed, vec![6, 2, 9, 1, 5]);
    }

    #[test]
    fn test_remove_relinks_bucket() {
        let mut map = identity_map(4);
        for key in [1, 5, 9, 13] {
            map.insert(key, "x").unwrap();
        }
        assert_eq!(map.remove(&5), Ok("x"));
        assert_eq!(map.remove(&13), Ok("x"));
        assert_eq!(map.remove(&1), Ok("x"));
        map.check_consistency();
        assert_eq!(map.bucket_len(1), Some(1));
        assert_eq!(map.iter().map(|(key, _)| *key).collect::<Vec<_>>(), vec![9]);
        assert_eq!(map.remove(&5), Err(MapError::NotFound));
    }

    #[test]
    fn test_cursor_walk() {
        let mut map = identity_map(8);
        for key in [3, 6, 11] {
            map.insert(key, "v").unwrap();
        }

        let mut cursor = map.cursor_front();
        assert_eq!(cursor.key(), Some(&3));
        assert_eq!(cursor.move_prev(), Err(MapError::IteratorOutOfRange));
        cursor.move_next().unwrap();
        assert_eq!(cursor.key(), Some(&11));
        cursor.move_next().unwrap();
        assert_eq!(cursor.key(), Some(&6));
        cursor.move_next().unwrap();
        assert!(cursor.is_end());
        assert_eq!(cursor, map.cursor_end());
        assert_eq!(cursor.move_next(), Err(MapError::IteratorOutOfRange));

        cursor.move_prev().unwrap();
        assert_eq!(cursor.key(), Some(&6));
        cursor.move_prev().unwrap();
        assert_eq!(cursor.key(), Some(&11));
    }

    #[test]
    fn test_cursor_on_empty_map() {
        let map = identity_map(3);
        let mut cursor = map.cursor_front();
        assert!(cursor.is_end());
        assert_eq!(cursor.move_next(), Err(MapError::IteratorOutOfRange));
        assert_eq!(cursor.move_prev(), Err(MapError::IteratorOutOfRange));
    }

    #[test]
    fn test_cursor_mut() {
        let mut map = identity_map(2);
        for key in 0..6 {
            map.insert(key, "even").unwrap();
        }

        let mut cursor = map.find_mut(&3);
        *cursor.value_mut().unwrap() = "odd";
        assert_eq!(cursor.as_cursor().value(), Some(&"odd"));

        let mut cursor = map.cursor_front_mut();
        while !cursor.is_end() {
            if cursor.key().is_some_and(|key| key % 2 == 0) {
                cursor.remove_current().unwrap();
            } else {
                cursor.move_next().unwrap();
            }
        }
        assert_eq!(cursor.remove_current(), Err(MapError::IteratorOutOfRange));
        map.check_consistency();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(&3), Some(&"odd"));
        assert_eq!(map.get(&5), Some(&"even"));
    }

    #[test]
    fn test_zero_buckets_clamped() {
        let mut map = ChainedHashMap::with_bucket_count(0);
        assert_eq!(map.bucket_count(), 1);
        map.insert(1, 1).unwrap();
        map.insert(2, 2).unwrap();
        assert_eq!(map.get(&2), Some(&2));
        map.check_consistency();
    }

    #[test]
    fn test_get_or_default() {
        let mut map: ChainedHashMap<String, u32> = ChainedHashMap::with_bucket_count(8);
        for word in "a b a c a b".split(' ') {
            *map.get_or_default(word.to_owned()).unwrap() += 1;
        }
        assert_eq!(map.value_of("a"), Ok(&3));
        assert_eq!(map.value_of("b"), Ok(&2));
        assert_eq!(map["c"], 1);
        assert_eq!(map.value_of("d"), Err(MapError::NotFound));
        assert_eq!(map.value_of_mut("d"), Err(MapError::NotFound));
        map.check_consistency();
    }

    #[test]
    fn test_clear() {
        let mut map = identity_map(4);
        for key in 0..20 {
            map.insert(key, "v").unwrap();
        }
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.bucket_count(), 4);
        assert_eq!(map.iter().count(), 0);
        map.insert(7, "w").unwrap();
        map.check_consistency();
    }

    #[test]
    fn test_try_from_entries_sizes_buckets() {
        let map: ChainedHashMap<i32, char> =
            ChainedHashMap::try_from_entries([(1, 'a'), (2, 'b'), (3, 'c')]).unwrap();
        assert_eq!(map.bucket_count(), 3);
        assert_eq!(map.len(), 3);

        let empty: ChainedHashMap<i32, char> = ChainedHashMap::try_from_entries([]).unwrap();
        assert_eq!(empty.bucket_count(), 1);
    }

    #[test]
    fn test_equality_needs_same_bucket_count() {
        let mut lhs = ChainedHashMap::with_bucket_count(4);
        let mut rhs = ChainedHashMap::with_bucket_count(8);
        lhs.insert(1, "a").unwrap();
        rhs.insert(1, "a").unwrap();
        assert_ne!(lhs, rhs);
    }
}
