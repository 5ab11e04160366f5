use std::collections::HashMap;

use rand::{rngs::SmallRng, Rng, SeedableRng};

use super::*;

type Points = Vec<Vec<SkipPoint<String>>>;

fn snapshot<M>(l: &mut SkipList<String, M>, level: usize) -> (Vec<String>, Points)
where
  M: NodeMap<String>,
{
  let keys = l.keys().unwrap();
  let mut points = vec![
    l.head().points()[..level].to_vec(),
    l.tail().points()[..level].to_vec(),
  ];
  for k in &keys {
    points.push(l.map_mut().node(k).unwrap().points().to_vec());
  }
  (keys, points)
}

fn slot(model: &[String], at: usize) -> Option<String> {
  at.checked_sub(1).map(|i| model[i].clone())
}

pub(crate) fn empty<M>(mut l: SkipList<String, M>)
where
  M: NodeMap<String>,
{
  assert!(l.is_empty());
  assert_eq!(l.len(), 0);
  assert_eq!(l.level(), 1);
  assert_eq!(l.first().unwrap(), None);
  assert_eq!(l.last().unwrap(), None);

  assert!(matches!(
    l.get(0),
    Err(Error::IndexOutOfRange { index: 0, len: 0 })
  ));
  assert!(matches!(
    l.get(-1),
    Err(Error::IndexOutOfRange { index: -1, len: 0 })
  ));
  assert!(matches!(l.position(&key(0)), Err(Error::KeyNotFound(k)) if k == key(0)));
  assert!(matches!(l.remove(&key(0)), Err(Error::KeyNotFound(_))));
  assert!(l.keys().unwrap().is_empty());
  l.check().unwrap();
}

pub(crate) fn basic<M>(mut l: SkipList<String, M>)
where
  M: NodeMap<String>,
{
  let (a, b, c) = ("A".to_string(), "B".to_string(), "C".to_string());

  l.insert(a.clone(), None).unwrap();
  l.insert(b.clone(), Some(&a)).unwrap();
  l.insert(c.clone(), Some(&a)).unwrap();
  l.check().unwrap();

  assert_eq!(l.len(), 3);
  assert_eq!(l.keys().unwrap(), [a.clone(), c.clone(), b.clone()]);
  assert_eq!(l.position(&a).unwrap(), 0);
  assert_eq!(l.position(&c).unwrap(), 1);
  assert_eq!(l.position(&b).unwrap(), 2);
  assert_eq!(l.get(1).unwrap(), c);
  assert_eq!(l.first().unwrap(), Some(a.clone()));
  assert_eq!(l.last().unwrap(), Some(b.clone()));
  assert_eq!(l.next(&a).unwrap(), Some(c.clone()));
  assert_eq!(l.next(&b).unwrap(), None);
  assert_eq!(l.previous(&b).unwrap(), Some(c.clone()));
  assert_eq!(l.previous(&a).unwrap(), None);

  l.remove(&a).unwrap();
  l.check().unwrap();
  assert_eq!(l.len(), 2);
  assert_eq!(l.keys().unwrap(), [c.clone(), b.clone()]);
  assert_eq!(l.position(&c).unwrap(), 0);
  assert_eq!(l.position(&b).unwrap(), 1);
  assert!(matches!(l.position(&a), Err(Error::KeyNotFound(_))));
}

pub(crate) fn front_inserts<M>(mut l: SkipList<String, M>)
where
  M: NodeMap<String>,
{
  for i in 0..200 {
    l.insert(key(i), None).unwrap();
  }
  l.check().unwrap();

  assert_eq!(l.keys().unwrap(), (0..200).rev().map(key).collect::<Vec<_>>());
  for i in 0..200 {
    assert_eq!(l.position(&key(i)).unwrap(), 199 - i);
  }
}

pub(crate) fn sequential<M>(mut l: SkipList<String, M>)
where
  M: NodeMap<String>,
{
  const N: usize = 1000;

  let mut last = None;
  for i in 0..N {
    l.insert(key(i), last.as_ref()).unwrap();
    last = Some(key(i));
  }
  l.check().unwrap();
  assert_eq!(l.len(), N);

  for i in 0..N {
    assert_eq!(l.get(i as isize).unwrap(), key(i));
    assert_eq!(l.position(&key(i)).unwrap(), i);
  }
  assert_eq!(l.get(-1).unwrap(), key(N - 1));
  assert_eq!(l.get(-(N as isize)).unwrap(), key(0));
}

pub(crate) fn insert_existing_moves<M>(mut l: SkipList<String, M>)
where
  M: NodeMap<String>,
{
  l.rebuild((0..5).map(key)).unwrap();
  l.insert(key(4), None).unwrap();
  l.check().unwrap();

  assert_eq!(l.len(), 5);
  assert_eq!(l.keys().unwrap(), [key(4), key(0), key(1), key(2), key(3)]);

  l.insert(key(4), Some(&key(3))).unwrap();
  l.check().unwrap();
  assert_eq!(l.keys().unwrap(), (0..5).map(key).collect::<Vec<_>>());
}

pub(crate) fn preconditions<M>(mut l: SkipList<String, M>)
where
  M: NodeMap<String>,
{
  l.rebuild((0..3).map(key)).unwrap();
  let before = l.keys().unwrap();

  assert!(matches!(
    l.insert(key(1), Some(&key(1))),
    Err(Error::Assertion(_))
  ));
  assert!(matches!(
    l.insert(key(9), Some(&key(9))),
    Err(Error::Assertion(_))
  ));
  assert!(matches!(
    l.insert(key(9), Some(&key(8))),
    Err(Error::KeyNotFound(k)) if k == key(8)
  ));
  assert!(matches!(
    l.move_after(&key(9), None),
    Err(Error::KeyNotFound(k)) if k == key(9)
  ));
  assert!(matches!(
    l.move_after(&key(0), Some(&key(8))),
    Err(Error::KeyNotFound(k)) if k == key(8)
  ));
  assert!(matches!(
    l.move_after(&key(0), Some(&key(0))),
    Err(Error::Assertion(_))
  ));
  assert!(matches!(l.remove(&key(9)), Err(Error::KeyNotFound(_))));
  assert!(matches!(l.next(&key(9)), Err(Error::KeyNotFound(_))));
  assert!(matches!(l.previous(&key(9)), Err(Error::KeyNotFound(_))));

  assert!(l.is_valid());
  assert_eq!(l.len(), 3);
  assert_eq!(l.keys().unwrap(), before);
  l.check().unwrap();
}

pub(crate) fn negative_index<M>(mut l: SkipList<String, M>)
where
  M: NodeMap<String>,
{
  l.rebuild((0..10).map(key)).unwrap();

  for i in 1..=10usize {
    assert_eq!(l.get(-(i as isize)).unwrap(), key(10 - i));
  }
  assert_eq!(l.get(-1).unwrap(), l.get(9).unwrap());
  assert!(matches!(
    l.get(10),
    Err(Error::IndexOutOfRange { index: 10, len: 10 })
  ));
  assert!(matches!(
    l.get(-11),
    Err(Error::IndexOutOfRange { index: -11, len: 10 })
  ));
}

pub(crate) fn levels<M>(mut l: SkipList<String, M>)
where
  M: NodeMap<String>,
{
  l.rebuild((0..300).map(key)).unwrap();
  let level = l.level();
  assert!(level > 1);

  let mut counts = Vec::with_capacity(level);
  for lvl in 1..=level {
    let mut count = 0;
    let mut cursor = l.first_at(lvl).unwrap();
    while let Some(k) = cursor {
      assert!(l.map_mut().node(&k).unwrap().level() >= lvl);
      count += 1;
      cursor = l.next_at(&k, lvl).unwrap();
    }

    let mut back = 0;
    let mut cursor = l.last_at(lvl).unwrap();
    while let Some(k) = cursor {
      back += 1;
      cursor = l.previous_at(&k, lvl).unwrap();
    }
    assert_eq!(count, back);
    counts.push(count);
  }
  assert_eq!(counts[0], 300);
  assert!(counts.windows(2).all(|w| w[0] >= w[1]));
  assert!(counts.iter().all(|c| *c > 0));

  assert!(matches!(
    l.first_at(level + 1),
    Err(Error::IndexOutOfRange { len, .. }) if len == level
  ));
  assert!(matches!(
    l.last_at(0),
    Err(Error::IndexOutOfRange { index: 0, .. })
  ));

  let height = l.map_mut().node(&key(0)).unwrap().level();
  assert!(matches!(
    l.next_at(&key(0), height + 1),
    Err(Error::IndexOutOfRange { len, .. }) if len == height
  ));
  assert!(matches!(
    l.previous_at(&key(0), 0),
    Err(Error::IndexOutOfRange { .. })
  ));
}

pub(crate) fn invalid<M>(mut l: SkipList<String, M>)
where
  M: NodeMap<String>,
{
  l.rebuild((0..5).map(key)).unwrap();
  l.validate(false);
  assert!(!l.is_valid());

  assert!(matches!(l.get(0), Err(Error::IndexInvalid)));
  assert!(matches!(l.position(&key(0)), Err(Error::IndexInvalid)));
  assert!(matches!(l.insert(key(9), None), Err(Error::IndexInvalid)));
  assert!(matches!(
    l.move_after(&key(0), None),
    Err(Error::IndexInvalid)
  ));
  assert!(matches!(l.remove(&key(0)), Err(Error::IndexInvalid)));
  assert!(matches!(l.first(), Err(Error::IndexInvalid)));
  assert!(matches!(l.last_at(1), Err(Error::IndexInvalid)));
  assert!(matches!(l.next(&key(0)), Err(Error::IndexInvalid)));
  assert!(matches!(l.previous(&key(0)), Err(Error::IndexInvalid)));
  assert!(matches!(
    l.after(&key(0), |k, p| k.cmp(p)),
    Err(Error::IndexInvalid)
  ));
  assert!(matches!(
    l.find(FindMode::Exact, |k| k.cmp(&key(0))),
    Err(Error::IndexInvalid)
  ));
  assert!(matches!(l.iter(), Err(Error::IndexInvalid)));
  assert!(matches!(l.keys(), Err(Error::IndexInvalid)));

  // accessors keep working
  assert_eq!(l.len(), 5);
  assert!(!l.is_empty());
  l.check().unwrap();

  l.validate(true);
  assert_eq!(l.keys().unwrap(), (0..5).map(key).collect::<Vec<_>>());
}

pub(crate) fn insert_remove_inverse<M>(mut l: SkipList<String, M>)
where
  M: NodeMap<String>,
{
  l.rebuild((0..50).map(|i| key(i * 2))).unwrap();
  let level = l.level();
  let before = snapshot(&mut l, level);

  for (probe, after) in [
    (key(1), Some(key(0))),
    (key(51), Some(key(50))),
    (key(999), None),
    (key(1000), Some(key(98))),
  ] {
    l.insert(probe.clone(), after.as_ref()).unwrap();
    l.check().unwrap();
    assert_eq!(l.len(), 51);

    l.remove(&probe).unwrap();
    l.check().unwrap();
    assert_eq!(snapshot(&mut l, level), before);
  }
}

pub(crate) fn move_after_previous<M>(mut l: SkipList<String, M>)
where
  M: NodeMap<String>,
{
  l.rebuild((0..30).map(key)).unwrap();
  let level = l.level();
  let before = snapshot(&mut l, level);

  for k in before.0.clone() {
    let prev = l.previous(&k).unwrap();
    l.move_after(&k, prev.as_ref()).unwrap();
    assert_eq!(snapshot(&mut l, level), before);
  }
}

pub(crate) fn clear<M>(mut l: SkipList<String, M>)
where
  M: NodeMap<String>,
{
  l.rebuild((0..100).map(key)).unwrap();
  l.clear().unwrap();

  assert!(l.is_empty());
  assert_eq!(l.level(), 1);
  assert_eq!(l.first().unwrap(), None);
  assert!(l.keys().unwrap().is_empty());
  l.check().unwrap();

  l.insert(key(1), None).unwrap();
  l.insert(key(0), None).unwrap();
  assert_eq!(l.keys().unwrap(), [key(0), key(1)]);

  l.validate(false);
  l.clear().unwrap();
  assert!(l.is_valid());
  assert!(l.is_empty());
}

pub(crate) fn random_ops<M>(mut l: SkipList<String, M>)
where
  M: NodeMap<String>,
{
  let mut rng = SmallRng::seed_from_u64(0xfeed);
  let mut model: Vec<String> = Vec::new();
  let mut next_id = 0;

  for round in 0..800 {
    match rng.random_range(0..10) {
      0..=4 => {
        let k = key(next_id);
        next_id += 1;
        let at = rng.random_range(0..=model.len());
        l.insert(k.clone(), slot(&model, at).as_ref()).unwrap();
        model.insert(at, k);
      }
      5..=7 if !model.is_empty() => {
        let k = model.remove(rng.random_range(0..model.len()));
        let at = rng.random_range(0..=model.len());
        l.move_after(&k, slot(&model, at).as_ref()).unwrap();
        model.insert(at, k);
      }
      8..=9 if !model.is_empty() => {
        let k = model.remove(rng.random_range(0..model.len()));
        l.remove(&k).unwrap();
      }
      _ => {}
    }

    if round % 25 == 0 {
      l.check().unwrap();
      assert_eq!(l.keys().unwrap(), model);
    }
  }

  l.check().unwrap();
  assert_eq!(l.len(), model.len());
  for (i, k) in model.iter().enumerate() {
    assert_eq!(l.position(k).unwrap(), i);
    assert_eq!(&l.get(i as isize).unwrap(), k);
  }
}

#[test]
fn test_scripted_distances() {
  let (a, b, c, d) = (
    "a".to_string(),
    "b".to_string(),
    "c".to_string(),
    "d".to_string(),
  );
  let mut l = SkipList::with_generator(
    HashMap::<String, SkipNode<String>>::new(),
    Scripted::new([2, 1, 3, 1]),
  );

  l.insert(a.clone(), None).unwrap();
  l.insert(b.clone(), Some(&a)).unwrap();
  l.insert(c.clone(), Some(&b)).unwrap();
  l.insert(d.clone(), Some(&c)).unwrap();
  l.check().unwrap();
  assert_eq!(l.level(), 3);

  let distances = |node: &SkipNode<String>| {
    node
      .points()
      .iter()
      .map(SkipPoint::distance)
      .collect::<Vec<_>>()
  };
  assert_eq!(distances(l.head()), [1, 1, 3]);
  assert_eq!(distances(l.map_mut().node(&a).unwrap()), [1, 2]);
  assert_eq!(distances(l.map_mut().node(&b).unwrap()), [1]);
  assert_eq!(distances(l.map_mut().node(&c).unwrap()), [1, 1, 1]);
  assert_eq!(distances(l.map_mut().node(&d).unwrap()), [0]);
  assert_eq!(
    l.tail()
      .points()
      .iter()
      .map(|p| p.previous_key().cloned())
      .collect::<Vec<_>>(),
    [Some(d.clone()), Some(c.clone()), Some(c.clone())]
  );

  l.remove(&c).unwrap();
  l.check().unwrap();
  assert_eq!(l.level(), 3);
  assert_eq!(distances(l.head()), [1, 1, 3]);
  assert_eq!(distances(l.map_mut().node(&a).unwrap()), [1, 2]);
  assert_eq!(distances(l.map_mut().node(&b).unwrap()), [1]);
  assert_eq!(distances(l.map_mut().node(&d).unwrap()), [0]);
  assert_eq!(l.first_at(3).unwrap(), None);
  assert_eq!(l.last_at(2).unwrap(), Some(a.clone()));

  // c comes back with height 2 and lands in front
  l.insert(c.clone(), None).unwrap();
  l.check().unwrap();
  assert_eq!(l.keys().unwrap(), [c.clone(), a.clone(), b.clone(), d.clone()]);
  assert_eq!(distances(l.head()), [1, 1, 4]);
}

#[test]
fn test_tall_move() {
  let mut l = SkipList::with_generator(
    HashMap::<String, SkipNode<String>>::new(),
    Scripted::new([1, 4, 2, 1, 3, 1, 1, 2]),
  );
  l.rebuild((0..8).map(key)).unwrap();
  l.check().unwrap();

  let mut model = (0..8).map(key).collect::<Vec<_>>();
  for (from, to) in [(1, 7), (4, 0), (7, 3), (0, 6), (2, 2)] {
    let k = model.remove(from);
    l.move_after(&k, slot(&model, to).as_ref()).unwrap();
    model.insert(to, k);

    l.check().unwrap();
    assert_eq!(l.keys().unwrap(), model);
  }
}

#[test]
fn test_partial_failure_invalidates() {
  let mut l = SkipList::with_options(
    Flaky::new(HashMap::<String, SkipNode<String>>::new()),
    TEST_OPTIONS,
  );
  l.rebuild((0..10).map(key)).unwrap();

  l.map_mut().budget = Some(0);
  // preconditions fail before anything is touched
  assert!(matches!(
    l.move_after(&key(5), Some(&key(5))),
    Err(Error::Assertion(_))
  ));
  assert!(l.is_valid());

  assert!(matches!(
    l.move_after(&key(5), None),
    Err(Error::Collaborator(_))
  ));
  assert!(!l.is_valid());
  assert!(matches!(l.get(0), Err(Error::IndexInvalid)));
  assert!(matches!(l.insert(key(11), None), Err(Error::IndexInvalid)));

  l.map_mut().budget = None;
  l.rebuild((0..10).map(key)).unwrap();
  assert!(l.is_valid());
  l.check().unwrap();
  assert_eq!(l.keys().unwrap(), (0..10).map(key).collect::<Vec<_>>());
}

#[test]
fn test_reopen_from_parts() {
  let mut l = SkipList::with_options(HashMap::<String, SkipNode<String>>::new(), TEST_OPTIONS);
  l.rebuild((0..64).map(key)).unwrap();

  let (map, head, tail) = l.into_parts();
  let mut l = SkipList::from_parts(map, head, tail, Geometric::new(TEST_OPTIONS));
  l.check().unwrap();
  assert_eq!(l.get(42).unwrap(), key(42));
  assert_eq!(l.position(&key(17)).unwrap(), 17);

  l.insert(key(100), Some(&key(10))).unwrap();
  l.check().unwrap();
  assert_eq!(l.position(&key(11)).unwrap(), 12);
}
