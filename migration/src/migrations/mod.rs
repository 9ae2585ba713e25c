pub mod m202508010001_create_users;
pub mod m202508010002_create_rooms;
pub mod m202508010003_create_room_members;
pub mod m202508010004_create_unread_counters;
pub mod m202508010005_create_messages;
