/// Readiness directions watched for a single descriptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Interest {
    pub read: bool,
    pub write: bool,
    pub except: bool,
}

impl Interest {
    pub const READ: Interest = Interest {
        read: true,
        write: false,
        except: false,
    };

    pub const WRITE: Interest = Interest {
        read: false,
        write: true,
        except: false,
    };

    /// Write readiness plus exceptional conditions, so a failed non-blocking
    /// connect wakes the waiter on every platform.
    pub const CONNECT: Interest = Interest {
        read: false,
        write: true,
        except: true,
    };

    pub fn is_empty(&self) -> bool {
        !(self.read || self.write || self.except)
    }
}
