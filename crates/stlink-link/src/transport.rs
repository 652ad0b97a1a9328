//! A narrow trait over [`stlink_scsi::ScsiTransport`] so the command layer
//! can be exercised against an in-memory double in tests without opening a
//! real `/dev/sg*` node.

use stlink_proto::opcode::CDB_LEN;
use stlink_scsi::{Result as ScsiResult, TransferOutcome};

pub trait Transport {
    fn execute_none(&mut self, cdb: &[u8; CDB_LEN], timeout_ms: u32) -> ScsiResult<TransferOutcome>;
    fn execute_read(
        &mut self,
        cdb: &[u8; CDB_LEN],
        buf: &mut [u8],
        timeout_ms: u32,
    ) -> ScsiResult<TransferOutcome>;
    fn execute_write(
        &mut self,
        cdb: &[u8; CDB_LEN],
        buf: &[u8],
        timeout_ms: u32,
    ) -> ScsiResult<TransferOutcome>;
}

impl Transport for stlink_scsi::ScsiTransport {
    fn execute_none(&mut self, cdb: &[u8; CDB_LEN], timeout_ms: u32) -> ScsiResult<TransferOutcome> {
        stlink_scsi::ScsiTransport::execute_none(self, cdb, timeout_ms)
    }

    fn execute_read(
        &mut self,
        cdb: &[u8; CDB_LEN],
        buf: &mut [u8],
        timeout_ms: u32,
    ) -> ScsiResult<TransferOutcome> {
        stlink_scsi::ScsiTransport::execute_read(self, cdb, buf, timeout_ms)
    }

    fn execute_write(
        &mut self,
        cdb: &[u8; CDB_LEN],
        buf: &[u8],
        timeout_ms: u32,
    ) -> ScsiResult<TransferOutcome> {
        stlink_scsi::ScsiTransport::execute_write(self, cdb, buf, timeout_ms)
    }
}

#[cfg(test)]
pub mod mock {
    //! A scripted transport double used by command-layer and flash-engine
    //! tests. Records every CDB it receives and plays back one reply per
    //! call, in order.

    use super::*;
    use std::collections::VecDeque;

    pub enum Reply {
        None,
        Read(Vec<u8>),
        /// Written data is checked against the given expectation.
        Write,
    }

    #[derive(Default)]
    pub struct MockTransport {
        pub calls: Vec<(Vec<u8>, Vec<u8>)>,
        pub replies: VecDeque<Reply>,
    }

    impl MockTransport {
        pub fn push_reply(&mut self, reply: Reply) {
            self.replies.push_back(reply);
        }

        fn next_reply(&mut self) -> Reply {
            self.replies.pop_front().unwrap_or(Reply::None)
        }
    }

    impl Transport for MockTransport {
        fn execute_none(
            &mut self,
            cdb: &[u8; CDB_LEN],
            _timeout_ms: u32,
        ) -> ScsiResult<TransferOutcome> {
            self.calls.push((cdb.to_vec(), Vec::new()));
            self.next_reply();
            Ok(TransferOutcome { status: 0 })
        }

        fn execute_read(
            &mut self,
            cdb: &[u8; CDB_LEN],
            buf: &mut [u8],
            _timeout_ms: u32,
        ) -> ScsiResult<TransferOutcome> {
            self.calls.push((cdb.to_vec(), Vec::new()));
            if let Reply::Read(data) = self.next_reply() {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
            }
            Ok(TransferOutcome { status: 0 })
        }

        fn execute_write(
            &mut self,
            cdb: &[u8; CDB_LEN],
            buf: &[u8],
            _timeout_ms: u32,
        ) -> ScsiResult<TransferOutcome> {
            self.calls.push((cdb.to_vec(), buf.to_vec()));
            self.next_reply();
            Ok(TransferOutcome { status: 0 })
        }
    }
}
