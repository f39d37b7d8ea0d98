use std::collections::HashMap;
use std::hash::Hash;

/// Group `rows` by key. Groups come out in order of first appearance of
/// their key; rows keep their arrival order within a group.
pub fn group_by_first_appearance<K, V, I, F>(rows: I, key: F) -> Vec<(K, Vec<V>)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = V>,
    F: Fn(&V) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<V>)> = Vec::new();

    for row in rows {
        let k = key(&row);
        match index.get(&k) {
            Some(&position) => groups[position].1.push(row),
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, vec![row]));
            }
        }
    }
    groups
}

/// Group child rows under their parent key.
///
/// Every parent gets an entry, empty when no child references it, so
/// callers can attach results without distinguishing "no children" from
/// "not loaded".
pub fn group_by_parent<K, V, I, F>(rows: I, parents: &[K], parent_key: F) -> HashMap<K, Vec<V>>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = V>,
    F: Fn(&V) -> K,
{
    let mut grouped: HashMap<K, Vec<V>> = parents.iter().map(|k| (k.clone(), Vec::new())).collect();
    for row in rows {
        grouped.entry(parent_key(&row)).or_default().push(row);
    }
    grouped
}

/// Keys in order of first appearance, without repeats
pub fn distinct<K, I>(keys: I) -> Vec<K>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut seen = std::collections::HashSet::new();
    keys.into_iter().filter(|k| seen.insert(k.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_first_appearance_keeps_order() {
        let rows = vec![(2, 'a'), (1, 'b'), (2, 'c'), (3, 'd'), (1, 'e')];
        let groups = group_by_first_appearance(rows, |row| row.0);

        let keys: Vec<i32> = groups.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![2, 1, 3]);
        assert_eq!(groups[0].1, vec![(2, 'a'), (2, 'c')]);
        assert_eq!(groups[1].1, vec![(1, 'b'), (1, 'e')]);
    }

    #[test]
    fn test_group_by_parent_initializes_every_parent() {
        let grouped = group_by_parent(vec![(1, "x"), (1, "y")], &[1, 2], |row| row.0);

        assert_eq!(grouped[&1].len(), 2);
        assert!(grouped[&2].is_empty());
    }

    #[test]
    fn test_distinct() {
        assert_eq!(distinct(vec![3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }
}
