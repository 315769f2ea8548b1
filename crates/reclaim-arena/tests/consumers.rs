//! Integration test: arena consumers that only see the allocation traits.

use reclaim_arena::{ChainArena, ChainConfig, MarkStack, ResetPolicy, VirtualArena, VirtualConfig};
use reclaim_core::{Alloc, StackAlloc};
use reclaim_test_utils::{KeyStore, MockVm};

const WORDS: &[&[u8]] = &[
    b"arena", b"bump", b"chain", b"arena", b"page", b"bump", b"restore", b"scope", b"page",
];

fn load<A: StackAlloc>(store: &mut KeyStore<A>) -> usize {
    WORDS
        .iter()
        .filter(|w| store.insert(w).unwrap())
        .count()
}

#[test]
fn key_store_on_virtual_arena_rolls_back_duplicates() {
    let config = VirtualConfig::new(64 * 1024).with_default_align(8);
    let mut store = KeyStore::new(VirtualArena::with_backend(config, MockVm::new(4096)).unwrap());
    assert_eq!(load(&mut store), 6);
    let distinct: usize = store.iter().map(<[u8]>::len).sum();
    assert_eq!(store.allocator().used_size(), distinct);
}

#[test]
fn key_store_on_chain_arena_rolls_back_duplicates() {
    let config = ChainConfig::new().with_initial_size(16).with_max_grow(64);
    let mut store = KeyStore::new(ChainArena::with_page_size(config, None).unwrap());
    assert_eq!(load(&mut store), 6);
    assert!(store.allocator().buffer_count() > 1);
    let distinct: usize = store.iter().map(<[u8]>::len).sum();
    assert_eq!(store.allocator().extent(), distinct);
    assert!(store.contains(b"restore"));
    assert!(!store.contains(b"commit"));
}

#[test]
fn key_store_through_a_borrowed_scope() {
    let mut arena = ChainArena::with_page_size(ChainConfig::new(), Some(4096)).unwrap();
    arena.alloc(100, 0).unwrap();
    let before = arena.save();
    {
        let mut scope = arena.scope();
        let mut store = KeyStore::new(&mut *scope);
        assert_eq!(load(&mut store), 6);
    }
    assert_eq!(arena.save(), before);
}

/// Depth-first walk that opens a scope per node, the way an evaluator keeps
/// per-level temporaries.
#[derive(Debug)]
struct Node {
    scratch: usize,
    children: Vec<Node>,
}

fn walk<A: StackAlloc>(marks: &mut MarkStack<A>, node: &Node, deepest: &mut usize) {
    marks.push();
    marks.alloc(node.scratch, 0).unwrap();
    *deepest = (*deepest).max(marks.depth());
    for child in &node.children {
        walk(marks, child, deepest);
    }
    marks.pop();
}

fn chain_of(depth: usize) -> Node {
    (0..depth).fold(
        Node {
            scratch: 8,
            children: Vec::new(),
        },
        |child, i| Node {
            scratch: 8 + i,
            children: vec![child],
        },
    )
}

#[test]
fn tree_walk_with_mark_stack_leaves_no_residue() {
    let tree = Node {
        scratch: 32,
        children: vec![chain_of(40), chain_of(3), chain_of(70)],
    };
    let mut marks = MarkStack::new(VirtualArena::new(VirtualConfig::new(1024 * 1024)).unwrap());
    marks.alloc(64, 0).unwrap();
    let mut deepest = 0;
    walk(&mut marks, &tree, &mut deepest);
    assert_eq!(deepest, 72);
    assert_eq!(marks.depth(), 0);
    assert_eq!(marks.get_ref().used_size(), 64);
}

#[test]
fn reset_between_passes_keeps_one_block() {
    let config = ChainConfig::new().with_initial_size(64).with_max_grow(256);
    for policy in [ResetPolicy::KeepLargest, ResetPolicy::Coalesce] {
        let mut arena = ChainArena::with_page_size(config.clone(), None).unwrap();
        for pass in 0..3 {
            let mut store = KeyStore::new(&mut arena);
            assert_eq!(load(&mut store), 6, "pass {pass}");
            drop(store);
            arena.reset(policy);
            assert_eq!(arena.buffer_count(), 1);
            assert_eq!(arena.extent(), 0);
        }
    }
}
