pub mod message;
pub mod room;
pub mod room_member;
pub mod unread_counter;
pub mod user;

pub use message::Entity as Message;
pub use room::Entity as Room;
pub use room_member::Entity as RoomMember;
pub use unread_counter::Entity as UnreadCounter;
pub use user::Entity as User;
