use guess_core::{GuessOutcome, Room};
use guess_types::{PlayerId, ROOM_SIZE};
use uuid::Uuid;

/// Three fresh player ids.
pub fn create_members() -> [PlayerId; ROOM_SIZE] {
    [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()]
}

/// Creates a room with a specific secret
pub fn create_room_with_secret(secret: i64) -> (Room, [PlayerId; ROOM_SIZE]) {
    let members = create_members();
    let room = Room::new(Uuid::new_v4(), members, secret).expect("valid room");
    (room, members)
}

/// Submits one guess per member, in member order
pub fn guess_all(room: &mut Room, guesses: [i64; ROOM_SIZE]) {
    let members = *room.members();
    for (member, guess) in members.iter().zip(guesses) {
        let outcome = room.record_guess(*member, guess).expect("member guess");
        assert!(matches!(outcome, GuessOutcome::Recorded { .. }));
    }
}
