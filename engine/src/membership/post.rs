//! Post membership.
//!
//! Posts inherit from parent posts and, through the terms they are
//! attached to, from the term hierarchy.

use std::collections::BTreeMap;

use uam_common::{ObjectId, ObjectRef, ObjectType};

use super::term::full_terms;
use super::{MembershipHandler, ObjectMembership, ResolveContext};
use crate::groups::AccessGroup;
use crate::objects::MembershipFamily;

#[derive(Debug, Clone, Copy, Default)]
pub struct PostMembershipHandler;

impl MembershipHandler for PostMembershipHandler {
    fn family(&self) -> MembershipFamily {
        MembershipFamily::Post
    }

    fn object_membership(
        &self,
        ctx: &ResolveContext<'_>,
        group: &dyn AccessGroup,
        lock_recursive: bool,
        object_type: &ObjectType,
        object_id: &ObjectId,
    ) -> ObjectMembership {
        let object = ObjectRef::new(object_type.clone(), object_id.clone());
        let mut membership = ObjectMembership::direct(group.assignment_for(ctx, &object));

        if !lock_recursive {
            return membership;
        }

        let post_tree = ctx.relations.post_tree();
        let term_tree = ctx.relations.term_tree();
        let containers = ctx.relations.containers();

        let mut sources: Vec<&ObjectId> = vec![object_id];
        sources.extend(post_tree.ancestors(object_id).iter().map(|ancestor| &ancestor.id));

        membership.inherit_from(ctx, group, post_tree.ancestors(object_id));

        for post_id in sources {
            for term in containers.terms_of_post(post_id) {
                membership.inherit_from(ctx, group, std::iter::once(term));
                membership.inherit_from(ctx, group, term_tree.ancestors(&term.id));
            }
        }

        membership
    }

    fn full_object_membership(
        &self,
        ctx: &ResolveContext<'_>,
        group: &dyn AccessGroup,
        lock_recursive: bool,
        object_type: &ObjectType,
        object_id: &ObjectId,
    ) -> ObjectMembership {
        let mut membership =
            self.object_membership(ctx, group, lock_recursive, object_type, object_id);

        if lock_recursive {
            let tree = ctx.relations.post_tree();
            membership.inherit_from(ctx, group, tree.descendants(object_id));
        }

        membership
    }

    fn full_objects(
        &self,
        ctx: &ResolveContext<'_>,
        group: &dyn AccessGroup,
        lock_recursive: bool,
    ) -> BTreeMap<ObjectId, ObjectType> {
        let mut posts = BTreeMap::new();
        let post_tree = ctx.relations.post_tree();

        let add_with_descendants = |posts: &mut BTreeMap<ObjectId, ObjectType>, post: ObjectRef| {
            if lock_recursive {
                for descendant in post_tree.descendants(&post.id) {
                    posts
                        .entry(descendant.id.clone())
                        .or_insert_with(|| descendant.object_type.clone());
                }
            }
            posts.insert(post.id, post.object_type);
        };

        for post_type in ctx.types.post_types() {
            for id in group.assigned_objects(ctx, post_type).into_keys() {
                add_with_descendants(&mut posts, ObjectRef::new(post_type.clone(), id));
            }
        }

        if lock_recursive {
            let containers = ctx.relations.containers();
            for term_id in full_terms(ctx, group, lock_recursive).into_keys() {
                for post in containers.posts_of_term(&term_id) {
                    add_with_descendants(&mut posts, post.clone());
                }
            }
        }

        posts
    }
}
