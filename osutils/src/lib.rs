pub mod apt;
pub mod blkid;
pub mod block_devices;
pub mod dependencies;
pub mod files;
pub mod gpg;
pub mod lvm;
pub mod mkfs;
pub mod mount;
pub mod mountpoint;
pub mod osrelease;
pub mod psql;
pub mod systemctl;
pub mod tabfile;
pub mod wipefs;
pub mod zfs;
