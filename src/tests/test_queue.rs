#[cfg(test)]
mod test_queue {
    use crate::queue::{ExecutionPackage, ExecutionQueue};
    use chrono::{Duration, Utc};

    #[test]
    fn test_fifo_with_duplicates() {
        let now = Utc::now();
        let mut queue: ExecutionQueue = ExecutionQueue::new();
        assert!(queue.is_empty());
        for (offset, process_id) in [3, 1, 3, 2].into_iter().enumerate() {
            queue.push(ExecutionPackage::new(process_id, now + Duration::seconds(offset as i64)));
        }
        assert_eq!(queue.len(), 4);
        assert_eq!(queue.peek().map(|item| item.process_id), Some(3));

        let mut popped = Vec::new();
        while let Some(item) = queue.pop() {
            assert!(item.register_id.is_none());
            popped.push((item.process_id, item.execution_date));
        }
        assert_eq!(popped, vec![
            (3, now),
            (1, now + Duration::seconds(1)),
            (3, now + Duration::seconds(2)),
            (2, now + Duration::seconds(3)),
        ]);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_remove_and_purge() {
        let now = Utc::now();
        let mut queue: ExecutionQueue = ExecutionQueue::new();
        for process_id in [5, 6, 5, 7, 5] {
            queue.push(ExecutionPackage::new(process_id, now));
        }
        assert!(queue.contains(5));
        assert_eq!(queue.remove(5), 3);
        assert!(!queue.contains(5));
        assert_eq!(queue.remove(5), 0);
        assert_eq!(queue.peek().map(|item| item.process_id), Some(6));
        assert_eq!(queue.purge(), 2);
        assert!(queue.is_empty());
    }
}
