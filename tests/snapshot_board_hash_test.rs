use tui_2048::core::{GameSnapshot, GameState};
use tui_2048::types::{Direction, MAX_GRID_SIZE};

fn fnv1a64_bytes(bytes: impl Iterator<Item = u8>) -> u64 {
    // FNV-1a 64-bit.
    let mut h: u64 = 0xcbf29ce484222325;
    for b in bytes {
        h ^= b as u64;
        h = h.wrapping_mul(0x00000100000001B3);
    }
    h
}

fn fnv1a64_board(board: &[[u32; MAX_GRID_SIZE as usize]; MAX_GRID_SIZE as usize], size: u8) -> u64 {
    let n = size as usize;
    fnv1a64_bytes(
        board[..n]
            .iter()
            .flat_map(|row| row[..n].iter().flat_map(|v| v.to_le_bytes())),
    )
}

#[test]
fn snapshot_into_sets_board_hash() {
    let mut gs = GameState::new(1);
    gs.start();

    let mut snap = GameSnapshot::default();
    gs.snapshot_into(&mut snap);
    assert_eq!(snap.board_hash, fnv1a64_board(&snap.board, snap.size));

    for dir in Direction::ALL {
        let _ = gs.try_move(dir);
    }

    gs.snapshot_into(&mut snap);
    assert_eq!(snap.board_hash, fnv1a64_board(&snap.board, snap.size));
}

#[test]
fn snapshot_matches_board_cells() {
    let mut gs = GameState::new(11).with_grid_size(6);
    gs.start();
    for i in 0..30 {
        let _ = gs.try_move(Direction::ALL[i % 4]);
    }

    let snap = gs.snapshot();
    assert_eq!(snap.size, 6);
    assert_eq!(snap.tile_count as usize, gs.board().tiles().len());
    let rows = gs.board().to_rows();
    for (r, row) in rows.iter().enumerate() {
        assert_eq!(&snap.board[r][..6], row.as_slice());
    }
    assert_eq!(snap.max_tile(), rows.iter().flatten().copied().max().unwrap());
    assert_eq!(snap.legal_moves, gs.board().legal_moves());
}

#[test]
fn board_hash_ignores_session_metadata() {
    let mut gs = GameState::new(3);
    gs.start();
    let before = gs.snapshot();

    // Same board, different best score.
    let other = gs.clone().with_best_score(10_000);
    let after = other.snapshot();
    assert_eq!(before.board_hash, after.board_hash);
    assert_ne!(before.best_score, after.best_score);
}
